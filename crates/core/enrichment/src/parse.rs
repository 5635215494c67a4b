use crate::EXTRACTED_SENTINEL;

/// Structured fields extracted by the stage-2 analysis
///
/// Field names mirror the JSON keys the model is instructed to emit.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Extracted {
    pub weapons: Vec<String>,
    pub vehicle_types: Vec<String>,
    pub license_plates: Vec<String>,
    pub suspects_count: Option<u32>,
    pub faces_detected: Option<u32>,
    pub ocr_text: Option<String>,
    /// Model confidence on a 0–1 scale
    pub confidence_score: Option<f64>,
}

/// Outcome of splitting a stage-2 completion into its two halves
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFullReport {
    /// Narrative paragraph
    pub narrative: String,
    /// Structured fields, when the JSON block parsed
    pub extracted: Option<Extracted>,
}

/// Split a stage-2 completion into narrative text and structured fields.
///
/// The model is instructed to separate the two with a sentinel line. Models
/// do not always comply, so when the sentinel is missing we fall back to
/// treating the trailing balanced `{...}` block as the JSON half. If neither
/// yields valid JSON the whole response becomes the narrative and the
/// structured fields stay empty.
pub fn parse_full_report(response: &str) -> ParsedFullReport {
    if let Some(index) = response.rfind(EXTRACTED_SENTINEL) {
        let narrative = response[..index].trim();
        let block = response[index + EXTRACTED_SENTINEL.len()..].trim();

        if let Ok(extracted) = serde_json::from_str::<Extracted>(block) {
            return ParsedFullReport {
                narrative: narrative.to_string(),
                extracted: Some(extracted),
            };
        }
    }

    if let Some(index) = trailing_json_start(response) {
        if let Ok(extracted) = serde_json::from_str::<Extracted>(response[index..].trim()) {
            return ParsedFullReport {
                narrative: response[..index].trim().to_string(),
                extracted: Some(extracted),
            };
        }
    }

    ParsedFullReport {
        narrative: response.trim().to_string(),
        extracted: None,
    }
}

/// Find the start of a top-level `{...}` block that closes at the end of
/// the text
fn trailing_json_start(text: &str) -> Option<usize> {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = None;
    let mut last_block = None;

    for (index, character) in trimmed.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match character {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(index);
                }
                depth += 1;
            }
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    last_block = start.map(|start| (start, index));
                }
            }
            _ => {}
        }
    }

    // Only accept a block that runs to the end of the response
    last_block
        .filter(|(_, end)| end + 1 == trimmed.len())
        .map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentinel() {
        let response = format!(
            "A suspect fled on foot along the canal road.\n{}\n{{\"weapons\":[\"Knife\"],\"suspectsCount\":1,\"confidenceScore\":0.82}}",
            EXTRACTED_SENTINEL
        );

        let parsed = parse_full_report(&response);
        assert_eq!(
            parsed.narrative,
            "A suspect fled on foot along the canal road."
        );

        let extracted = parsed.extracted.unwrap();
        assert_eq!(extracted.weapons, vec!["Knife".to_string()]);
        assert_eq!(extracted.suspects_count, Some(1));
        assert_eq!(extracted.confidence_score, Some(0.82));
    }

    #[test]
    fn falls_back_to_trailing_block() {
        let response = "Narrative text here.\n{\"weapons\":[\"Knife\"],\"suspectsCount\":1}";

        let parsed = parse_full_report(response);
        assert_eq!(parsed.narrative, "Narrative text here.");
        assert_eq!(
            parsed.extracted.unwrap().weapons,
            vec!["Knife".to_string()]
        );
    }

    #[test]
    fn nested_objects_in_trailing_block() {
        let response = "Report follows.\n{\"weapons\":[],\"ocrText\":\"PLATE {A}\"}";

        let parsed = parse_full_report(response);
        assert_eq!(parsed.narrative, "Report follows.");
        assert_eq!(
            parsed.extracted.unwrap().ocr_text,
            Some("PLATE {A}".to_string())
        );
    }

    #[test]
    fn unparseable_response_becomes_narrative() {
        let response = "The model refused to answer in the requested format.";

        let parsed = parse_full_report(response);
        assert_eq!(parsed.narrative, response);
        assert!(parsed.extracted.is_none());
    }

    #[test]
    fn invalid_json_after_sentinel_becomes_narrative() {
        let response = format!("Something happened.\n{}\nnot json", EXTRACTED_SENTINEL);

        let parsed = parse_full_report(&response);
        assert_eq!(parsed.narrative, response.trim());
        assert!(parsed.extracted.is_none());
    }
}
