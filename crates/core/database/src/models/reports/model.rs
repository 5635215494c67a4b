use base64::prelude::*;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use ulid::Ulid;
use vigil_config::config;
use vigil_enrichment::{
    parse_full_report, Extracted, InlineImage, LanguageModel, FULL_REPORT_SYSTEM_PROMPT,
    SUMMARY_SYSTEM_PROMPT,
};
use vigil_files::{Storage, StoredImage};
use vigil_result::Result;

use crate::{Coordinates, Database, User};

/// Longest accepted comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Longest accepted reply, in characters
pub const MAX_REPLY_LENGTH: usize = 500;

/// Folder reports upload their images into
static IMAGE_FOLDER: &str = "reports";

/// Narrative stored when the stage-2 call fails outright
static FULL_REPORT_FALLBACK: &str = "AI could not generate full report";

auto_derived!(
    /// A cast vote
    #[derive(Copy, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Vote {
        Upvote,
        Downvote,
    }

    /// Pair of mutually exclusive vote sets
    ///
    /// A user id is a member of at most one of the two sets; `toggle`
    /// maintains that invariant.
    #[derive(Default, Eq)]
    pub struct VoteSets {
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub upvotes: IndexSet<String>,
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub downvotes: IndexSet<String>,
    }

    /// Reply to a comment
    pub struct Reply {
        /// Unique Id within the parent comment
        pub id: String,
        /// Id of the user who wrote this reply
        pub author: String,
        /// Reply text
        pub text: String,
        #[serde(flatten)]
        pub votes: VoteSets,
        /// When this reply was written
        #[serde(with = "crate::util::datetime")]
        pub created_at: DateTime<Utc>,
    }

    /// Comment on a report
    pub struct Comment {
        /// Unique Id within the parent report
        pub id: String,
        /// Id of the user who wrote this comment
        pub author: String,
        /// Comment text
        pub text: String,
        #[serde(flatten)]
        pub votes: VoteSets,
        /// Replies to this comment
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub replies: Vec<Reply>,
        /// When this comment was written
        #[serde(with = "crate::util::datetime")]
        pub created_at: DateTime<Utc>,
    }

    /// Enrichment workflow state
    ///
    /// Transitions only ever move forward; `Failed` is terminal and
    /// reachable from any non-terminal state.
    #[derive(Copy, Eq, Default)]
    #[serde(rename_all = "snake_case")]
    pub enum AiStatus {
        #[default]
        ProcessingSummary,
        AwaitingUserApproval,
        ProcessingFullReport,
        Completed,
        Failed,
    }

    /// AI analysis attached to a report
    #[derive(Default)]
    pub struct AiReport {
        /// Workflow state
        pub status: AiStatus,
        /// Public-facing short summary, editable by the author
        #[serde(skip_serializing_if = "Option::is_none")]
        pub short_summary: Option<String>,
        /// Full forensic narrative
        #[serde(skip_serializing_if = "Option::is_none")]
        pub full_report: Option<String>,
        /// Structured fields extracted by stage 2
        #[serde(default)]
        pub extracted: Extracted,
        /// Whether the author approved the summary
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub reviewed_by_user: bool,
        /// When the author approved the summary
        #[serde(skip_serializing_if = "Option::is_none")]
        pub reviewed_at: Option<DateTime<Utc>>,
    }

    /// # Incident Report
    pub struct Report {
        /// Unique Id
        #[serde(rename = "_id")]
        pub id: String,
        /// Id of the user who filed this report
        pub author: String,

        /// Visible description; mirrors the approved summary
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        /// Raw description as submitted
        #[serde(skip_serializing_if = "Option::is_none")]
        pub incident_description: Option<String>,
        /// Uploaded evidence images
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub images: Vec<StoredImage>,

        /// Incident category, e.g. "robbery"
        pub category: String,
        /// Incident date as submitted
        pub date: String,
        /// Incident time as submitted
        pub time: String,
        /// Free-text incident location
        pub location_text: String,
        /// Incident coordinates
        #[serde(skip_serializing_if = "Option::is_none")]
        pub coordinates: Option<Coordinates>,
        /// Whether the author's identity is hidden
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub anonymous: bool,
        /// Whether the author consented to forensic processing
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub agreed: bool,

        /// Users who liked this report
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub likes: IndexSet<String>,
        #[serde(flatten)]
        pub votes: VoteSets,
        /// Comments on this report
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub comments: Vec<Comment>,

        /// Attached AI analysis
        #[serde(default)]
        pub ai_report: AiReport,

        /// When this report was filed
        #[serde(with = "crate::util::datetime")]
        pub created_at: DateTime<Utc>,
    }

    /// New report payload
    #[derive(Default)]
    pub struct DataCreateReport {
        pub incident_description: Option<String>,
        pub category: Option<String>,
        pub date: Option<String>,
        pub time: Option<String>,
        pub location_text: Option<String>,
        pub coordinates: Option<Coordinates>,
        #[serde(default)]
        pub anonymous: bool,
        #[serde(default)]
        pub agreed: bool,
    }

    /// Result of filing a report
    pub struct CreatedReport {
        pub report: Report,
        /// Stage-1 summary awaiting the author's approval
        pub short_summary: String,
        pub approval_required: bool,
    }

    /// Result of toggling a vote
    pub struct VoteOutcome {
        pub upvotes: usize,
        pub downvotes: usize,
        pub user_vote: Option<Vote>,
    }
);

/// Image payload accepted by report ingestion
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl VoteSets {
    /// Toggle a user's vote, returning their resulting vote
    ///
    /// Casting a vote implicitly withdraws the opposite vote; casting the
    /// same vote again withdraws it.
    pub fn toggle(&mut self, vote: Vote, user: &str) -> Option<Vote> {
        let (chosen, opposite) = match vote {
            Vote::Upvote => (&mut self.upvotes, &mut self.downvotes),
            Vote::Downvote => (&mut self.downvotes, &mut self.upvotes),
        };

        if chosen.shift_remove(user) {
            None
        } else {
            chosen.insert(user.to_string());
            opposite.shift_remove(user);
            Some(vote)
        }
    }

    /// The vote a user currently holds
    pub fn vote_of(&self, user: &str) -> Option<Vote> {
        if self.upvotes.contains(user) {
            Some(Vote::Upvote)
        } else if self.downvotes.contains(user) {
            Some(Vote::Downvote)
        } else {
            None
        }
    }

    fn outcome(&self, user: &str) -> VoteOutcome {
        VoteOutcome {
            upvotes: self.upvotes.len(),
            downvotes: self.downvotes.len(),
            user_vote: self.vote_of(user),
        }
    }
}

impl AiStatus {
    fn rank(self) -> u8 {
        match self {
            AiStatus::ProcessingSummary => 0,
            AiStatus::AwaitingUserApproval => 1,
            AiStatus::ProcessingFullReport => 2,
            AiStatus::Completed => 3,
            AiStatus::Failed => 4,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, AiStatus::Completed | AiStatus::Failed)
    }

    /// Move to the next state, rejecting any backward or skipping move
    pub fn advance(self, next: AiStatus) -> Result<AiStatus> {
        if self.is_terminal() {
            return Err(create_error!(InvalidOperation));
        }

        if let AiStatus::Failed = next {
            return Ok(AiStatus::Failed);
        }

        if next.rank() == self.rank() + 1 {
            Ok(next)
        } else {
            Err(create_error!(InvalidOperation))
        }
    }
}

impl Default for Report {
    fn default() -> Self {
        Self {
            id: Ulid::new().to_string(),
            author: Default::default(),
            description: None,
            incident_description: None,
            images: Default::default(),
            category: Default::default(),
            date: Default::default(),
            time: Default::default(),
            location_text: Default::default(),
            coordinates: None,
            anonymous: false,
            agreed: false,
            likes: Default::default(),
            votes: Default::default(),
            comments: Default::default(),
            ai_report: Default::default(),
            created_at: Utc::now(),
        }
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(create_error!(MissingRequiredField {
            field: field.to_string()
        })),
    }
}

fn validate_text(text: &str, max: usize) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(create_error!(EmptyText));
    }

    if text.chars().count() > max {
        return Err(create_error!(TextTooLong { max }));
    }

    Ok(text.to_string())
}

impl Report {
    /// File a new incident report
    ///
    /// Uploads evidence images strictly sequentially, rolling back every
    /// image uploaded so far if one fails, then persists the report and
    /// runs the stage-1 summary. A summary failure never fails ingestion;
    /// the raw description stands in for the summary instead.
    pub async fn create(
        db: &Database,
        storage: &Storage,
        model: &LanguageModel,
        author: &User,
        data: DataCreateReport,
        images: Vec<ImageUpload>,
    ) -> Result<CreatedReport> {
        let config = config().await;

        let category = required(data.category, "category")?;
        let date = required(data.date, "date")?;
        let time = required(data.time, "time")?;
        let location_text = required(data.location_text, "location_text")?;

        if images.len() > config.files.max_images {
            return Err(create_error!(TooManyImages {
                max: config.files.max_images
            }));
        }

        let mut uploaded: Vec<StoredImage> = Vec::new();
        for image in &images {
            if let Err(err) = validate_image(image, config.files.image_size) {
                Self::rollback_uploads(storage, &uploaded).await;
                return Err(err);
            }

            info!(
                "Uploading image {}/{}: {}",
                uploaded.len() + 1,
                images.len(),
                image.filename
            );

            match storage
                .upload(IMAGE_FOLDER, &image.content_type, &image.data)
                .await
            {
                Ok(stored) => uploaded.push(stored),
                Err(err) => {
                    Self::rollback_uploads(storage, &uploaded).await;
                    return Err(err);
                }
            }
        }

        let mut report = Report {
            author: author.id.to_string(),
            description: data.incident_description.clone(),
            incident_description: data.incident_description,
            images: uploaded,
            category,
            date,
            time,
            location_text,
            coordinates: data.coordinates,
            anonymous: data.anonymous,
            agreed: data.agreed,
            ..Default::default()
        };

        db.insert_report(&report).await?;
        report.run_summary_stage(db, model).await?;
        db.adjust_posts_count(&author.id, 1).await?;

        Ok(CreatedReport {
            short_summary: report.ai_report.short_summary.clone().unwrap_or_default(),
            approval_required: true,
            report,
        })
    }

    /// Best-effort cleanup of a partial upload set
    async fn rollback_uploads(storage: &Storage, uploaded: &[StoredImage]) {
        for stored in uploaded {
            if let Err(err) = storage.destroy(&stored.id).await {
                warn!("Failed to destroy {} during rollback: {err:?}", stored.id);
            }
        }
    }

    /// Run the stage-1 short summary and advance the workflow
    async fn run_summary_stage(&mut self, db: &Database, model: &LanguageModel) -> Result<()> {
        let prompt = self.summary_prompt();

        match model.complete(SUMMARY_SYSTEM_PROMPT, &prompt, &[]).await {
            Ok(summary) => self.ai_report.short_summary = Some(summary.trim().to_string()),
            Err(err) => {
                // Degraded but non-blocking: the raw description stands in
                warn!("Summary generation failed for {}: {err:?}", self.id);
                self.ai_report.short_summary = self.incident_description.clone();
            }
        }

        self.ai_report.status = self
            .ai_report
            .status
            .advance(AiStatus::AwaitingUserApproval)?;
        db.save_report(self).await
    }

    /// Approve (and optionally edit) the stage-1 summary
    ///
    /// Only the author may approve; an edited summary overwrites both the
    /// stored summary and the report's visible description.
    pub async fn approve_summary(
        &mut self,
        db: &Database,
        user: &User,
        edited_summary: Option<String>,
    ) -> Result<()> {
        if self.author != user.id {
            return Err(create_error!(NotOwner));
        }

        self.ai_report.status = self
            .ai_report
            .status
            .advance(AiStatus::ProcessingFullReport)?;

        if let Some(summary) = edited_summary {
            let summary = summary.trim().to_string();
            self.ai_report.short_summary = Some(summary.clone());
            self.description = Some(summary);
        }

        self.ai_report.reviewed_by_user = true;
        self.ai_report.reviewed_at = Some(Utc::now());

        db.save_report(self).await
    }

    /// Run the stage-2 full forensic report and complete the workflow
    ///
    /// Images that cannot be fetched back from storage are skipped rather
    /// than aborting; a failed completion stores a placeholder narrative.
    /// Either way the workflow completes so a reviewable record exists.
    pub async fn generate_full_report(
        &mut self,
        db: &Database,
        storage: &Storage,
        model: &LanguageModel,
    ) -> Result<()> {
        if !matches!(self.ai_report.status, AiStatus::ProcessingFullReport) {
            return Err(create_error!(InvalidOperation));
        }

        let mut inline_images = Vec::new();
        for image in &self.images {
            match storage.fetch(&image.id).await {
                Ok(buf) => inline_images.push(InlineImage {
                    content_type: image.content_type.clone(),
                    data: BASE64_STANDARD.encode(buf),
                }),
                Err(err) => warn!("Skipping image {}: {err:?}", image.id),
            }
        }

        let prompt = self.full_report_prompt();
        match model
            .complete(FULL_REPORT_SYSTEM_PROMPT, &prompt, &inline_images)
            .await
        {
            Ok(response) => {
                let parsed = parse_full_report(&response);
                self.ai_report.full_report = Some(parsed.narrative);
                if let Some(extracted) = parsed.extracted {
                    self.ai_report.extracted = extracted;
                }
            }
            Err(err) => {
                warn!("Full report generation failed for {}: {err:?}", self.id);
                self.ai_report.full_report = Some(FULL_REPORT_FALLBACK.to_string());
            }
        }

        self.ai_report.status = self.ai_report.status.advance(AiStatus::Completed)?;
        db.save_report(self).await
    }

    fn summary_prompt(&self) -> String {
        format!(
            "Category: {}\nDate: {} {}\nLocation: {}\nDescription: {}",
            self.category,
            self.date,
            self.time,
            self.location_text,
            self.incident_description.as_deref().unwrap_or("(none)")
        )
    }

    fn full_report_prompt(&self) -> String {
        format!(
            "Category: {}\nDate: {} {}\nLocation: {}\nDescription: {}\nApproved summary: {}",
            self.category,
            self.date,
            self.time,
            self.location_text,
            self.incident_description.as_deref().unwrap_or("(none)"),
            self.ai_report.short_summary.as_deref().unwrap_or("(none)")
        )
    }

    /// Toggle the viewer's upvote on this report
    pub async fn toggle_upvote(&mut self, db: &Database, user: &str) -> Result<VoteOutcome> {
        self.votes.toggle(Vote::Upvote, user);
        db.save_report(self).await?;
        Ok(self.votes.outcome(user))
    }

    /// Toggle the viewer's downvote on this report
    pub async fn toggle_downvote(&mut self, db: &Database, user: &str) -> Result<VoteOutcome> {
        self.votes.toggle(Vote::Downvote, user);
        db.save_report(self).await?;
        Ok(self.votes.outcome(user))
    }

    /// Toggle the viewer's vote on a comment
    pub async fn toggle_comment_vote(
        &mut self,
        db: &Database,
        comment_id: &str,
        vote: Vote,
        user: &str,
    ) -> Result<VoteOutcome> {
        let comment = self
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(UnknownComment))?;

        comment.votes.toggle(vote, user);
        let outcome = comment.votes.outcome(user);
        db.save_report(self).await?;
        Ok(outcome)
    }

    /// Toggle the viewer's vote on a reply
    pub async fn toggle_reply_vote(
        &mut self,
        db: &Database,
        comment_id: &str,
        reply_id: &str,
        vote: Vote,
        user: &str,
    ) -> Result<VoteOutcome> {
        let comment = self
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(UnknownComment))?;

        let reply = comment
            .replies
            .iter_mut()
            .find(|reply| reply.id == reply_id)
            .ok_or_else(|| create_error!(UnknownReply))?;

        reply.votes.toggle(vote, user);
        let outcome = reply.votes.outcome(user);
        db.save_report(self).await?;
        Ok(outcome)
    }

    /// Add a comment to this report
    pub async fn add_comment(&mut self, db: &Database, author: &str, text: &str) -> Result<Comment> {
        let comment = Comment {
            id: Ulid::new().to_string(),
            author: author.to_string(),
            text: validate_text(text, MAX_COMMENT_LENGTH)?,
            votes: Default::default(),
            replies: Default::default(),
            created_at: Utc::now(),
        };

        self.comments.push(comment.clone());
        db.save_report(self).await?;
        Ok(comment)
    }

    /// Add a reply to a comment on this report
    pub async fn add_reply(
        &mut self,
        db: &Database,
        author: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Reply> {
        let reply = Reply {
            id: Ulid::new().to_string(),
            author: author.to_string(),
            text: validate_text(text, MAX_REPLY_LENGTH)?,
            votes: Default::default(),
            created_at: Utc::now(),
        };

        let comment = self
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(UnknownComment))?;

        comment.replies.push(reply.clone());
        db.save_report(self).await?;
        Ok(reply)
    }

    /// Delete a comment; only its author may do so
    pub async fn delete_comment(
        &mut self,
        db: &Database,
        user: &str,
        comment_id: &str,
    ) -> Result<()> {
        let index = self
            .comments
            .iter()
            .position(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(UnknownComment))?;

        if self.comments[index].author != user {
            return Err(create_error!(NotOwner));
        }

        self.comments.remove(index);
        db.save_report(self).await
    }

    /// Delete a reply; only its author may do so
    pub async fn delete_reply(
        &mut self,
        db: &Database,
        user: &str,
        comment_id: &str,
        reply_id: &str,
    ) -> Result<()> {
        let comment = self
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(UnknownComment))?;

        let index = comment
            .replies
            .iter()
            .position(|reply| reply.id == reply_id)
            .ok_or_else(|| create_error!(UnknownReply))?;

        if comment.replies[index].author != user {
            return Err(create_error!(NotOwner));
        }

        comment.replies.remove(index);
        db.save_report(self).await
    }

    /// Update the visible description; only the author may do so
    pub async fn update_description(
        &mut self,
        db: &Database,
        user: &User,
        description: String,
    ) -> Result<()> {
        if self.author != user.id {
            return Err(create_error!(NotOwner));
        }

        self.description = Some(description);
        db.save_report(self).await
    }

    /// Delete this report, cascading deletion of its stored images
    ///
    /// Image cleanup is best-effort; a failed destroy is logged and does
    /// not fail the deletion.
    pub async fn delete(&self, db: &Database, storage: &Storage, user: &User) -> Result<()> {
        if self.author != user.id && !user.privileged {
            return Err(create_error!(NotOwner));
        }

        for image in &self.images {
            if let Err(err) = storage.destroy(&image.id).await {
                warn!("Failed to destroy image {}: {err:?}", image.id);
            }
        }

        db.delete_report(&self.id).await?;
        db.adjust_posts_count(&self.author, -1).await
    }
}

fn validate_image(image: &ImageUpload, max_size: usize) -> Result<()> {
    if !image.content_type.starts_with("image/") {
        return Err(create_error!(InvalidFileType));
    }

    if image.data.len() > max_size {
        return Err(create_error!(FileTooLarge { max: max_size }));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use vigil_enrichment::{LanguageModel, ReferenceModel, EXTRACTED_SENTINEL};
    use vigil_files::{ReferenceStorage, Storage};
    use vigil_result::ErrorType;

    use crate::{AiStatus, DataCreateReport, ImageUpload, Report, User, Vote, VoteSets};

    fn data() -> DataCreateReport {
        DataCreateReport {
            incident_description: Some("Two men on a motorbike snatched a phone.".to_string()),
            category: Some("robbery".to_string()),
            date: Some("2025-03-18".to_string()),
            time: Some("21:40".to_string()),
            location_text: Some("F-8 Markaz, Islamabad".to_string()),
            agreed: true,
            ..Default::default()
        }
    }

    fn image(filename: &str) -> ImageUpload {
        ImageUpload {
            filename: filename.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0u8; 64],
        }
    }

    fn storage() -> (Storage, ReferenceStorage) {
        let reference = ReferenceStorage::default();
        (Storage::Reference(reference.clone()), reference)
    }

    fn model() -> (LanguageModel, ReferenceModel) {
        let reference = ReferenceModel::default();
        (LanguageModel::Reference(reference.clone()), reference)
    }

    #[test]
    fn votes_are_mutually_exclusive() {
        let mut votes = VoteSets::default();

        assert_eq!(votes.toggle(Vote::Upvote, "alice"), Some(Vote::Upvote));
        assert_eq!(votes.vote_of("alice"), Some(Vote::Upvote));

        // Opposite vote withdraws the held one
        assert_eq!(votes.toggle(Vote::Downvote, "alice"), Some(Vote::Downvote));
        assert!(!votes.upvotes.contains("alice"));
        assert!(votes.downvotes.contains("alice"));

        // Same vote again withdraws it
        assert_eq!(votes.toggle(Vote::Downvote, "alice"), None);
        assert_eq!(votes.vote_of("alice"), None);
        assert!(votes.upvotes.is_empty() && votes.downvotes.is_empty());
    }

    #[test]
    fn workflow_only_moves_forward() {
        let status = AiStatus::ProcessingSummary;
        let status = status.advance(AiStatus::AwaitingUserApproval).unwrap();
        assert!(status.advance(AiStatus::Completed).is_err());
        assert!(status.advance(AiStatus::ProcessingSummary).is_err());

        let status = status.advance(AiStatus::ProcessingFullReport).unwrap();
        assert_eq!(status.advance(AiStatus::Failed).unwrap(), AiStatus::Failed);

        let done = AiStatus::Completed;
        assert!(done.advance(AiStatus::Failed).is_err());
        assert!(AiStatus::Failed.advance(AiStatus::Completed).is_err());
    }

    #[async_std::test]
    async fn create_requires_incident_fields() {
        database_test!(|db| async move {
            let (storage, _) = storage();
            let (model, _) = model();
            let author = User::create(&db, "amna".to_string(), "Amna".to_string())
                .await
                .unwrap();

            let mut incomplete = data();
            incomplete.category = None;

            let err = Report::create(&db, &storage, &model, &author, incomplete, vec![])
                .await
                .unwrap_err();
            assert!(matches!(
                err.error_type,
                ErrorType::MissingRequiredField { .. }
            ));
        });
    }

    #[async_std::test]
    async fn summary_failure_falls_back_to_description() {
        database_test!(|db| async move {
            let (storage, _) = storage();
            // Empty queue, every completion fails
            let (model, _) = model();
            let author = User::create(&db, "bilal".to_string(), "Bilal".to_string())
                .await
                .unwrap();

            let created = Report::create(&db, &storage, &model, &author, data(), vec![])
                .await
                .unwrap();

            assert_eq!(
                created.short_summary,
                "Two men on a motorbike snatched a phone."
            );

            let report = db.fetch_report(&created.report.id).await.unwrap();
            assert_eq!(report.ai_report.status, AiStatus::AwaitingUserApproval);
            assert_eq!(
                report.ai_report.short_summary.as_deref(),
                Some("Two men on a motorbike snatched a phone.")
            );

            let author = db.fetch_user(&author.id).await.unwrap();
            assert_eq!(author.posts_count, 1);
        });
    }

    #[async_std::test]
    async fn failed_upload_rolls_back_earlier_images() {
        database_test!(|db| async move {
            let (storage, objects) = storage();
            let (model, _) = model();
            let author = User::create(&db, "sara".to_string(), "Sara".to_string())
                .await
                .unwrap();

            objects.fail_uploads_after(1).await;

            let err = Report::create(
                &db,
                &storage,
                &model,
                &author,
                data(),
                vec![image("a.jpg"), image("b.jpg"), image("c.jpg")],
            )
            .await
            .unwrap_err();

            assert!(matches!(err.error_type, ErrorType::UploadFailed));
            assert!(objects.is_empty().await);
            assert!(db
                .fetch_reports_by_author(&author.id)
                .await
                .unwrap()
                .is_empty());

            let author = db.fetch_user(&author.id).await.unwrap();
            assert_eq!(author.posts_count, 0);
        });
    }

    #[async_std::test]
    async fn rejects_invalid_images() {
        database_test!(|db| async move {
            let (storage, objects) = storage();
            let (model, _) = model();
            let author = User::create(&db, "omar".to_string(), "Omar".to_string())
                .await
                .unwrap();

            let mut pdf = image("scan.pdf");
            pdf.content_type = "application/pdf".to_string();

            let err = Report::create(&db, &storage, &model, &author, data(), vec![pdf])
                .await
                .unwrap_err();
            assert!(matches!(err.error_type, ErrorType::InvalidFileType));

            let mut huge = image("huge.jpg");
            huge.data = vec![0u8; 5_242_881];

            let err = Report::create(
                &db,
                &storage,
                &model,
                &author,
                data(),
                vec![image("ok.jpg"), huge],
            )
            .await
            .unwrap_err();
            assert!(matches!(err.error_type, ErrorType::FileTooLarge { .. }));
            assert!(objects.is_empty().await);
        });
    }

    #[async_std::test]
    async fn only_the_author_approves_the_summary() {
        database_test!(|db| async move {
            let (storage, _) = storage();
            let (model, responses) = model();
            let author = User::create(&db, "zain".to_string(), "Zain".to_string())
                .await
                .unwrap();
            let other = User::create(&db, "hira".to_string(), "Hira".to_string())
                .await
                .unwrap();

            responses.queue_response("A phone was snatched in F-8.").await;
            let mut report = Report::create(&db, &storage, &model, &author, data(), vec![])
                .await
                .unwrap()
                .report;

            let err = report.approve_summary(&db, &other, None).await.unwrap_err();
            assert!(matches!(err.error_type, ErrorType::NotOwner));

            report
                .approve_summary(&db, &author, Some("Snatching near F-8 Markaz.".to_string()))
                .await
                .unwrap();

            let report = db.fetch_report(&report.id).await.unwrap();
            assert_eq!(report.ai_report.status, AiStatus::ProcessingFullReport);
            assert!(report.ai_report.reviewed_by_user);
            assert_eq!(
                report.ai_report.short_summary.as_deref(),
                Some("Snatching near F-8 Markaz.")
            );
            assert_eq!(report.description.as_deref(), Some("Snatching near F-8 Markaz."));
        });
    }

    #[async_std::test]
    async fn full_report_parses_extracted_fields() {
        database_test!(|db| async move {
            let (storage, _) = storage();
            let (model, responses) = model();
            let author = User::create(&db, "dani".to_string(), "Dani".to_string())
                .await
                .unwrap();

            responses.queue_response("Short summary.").await;
            let mut report = Report::create(
                &db,
                &storage,
                &model,
                &author,
                data(),
                vec![image("cctv.jpg")],
            )
            .await
            .unwrap()
            .report;

            report.approve_summary(&db, &author, None).await.unwrap();

            responses
                .queue_response(format!(
                    "At approximately 21:40 two suspects on a motorbike approached the victim.\n\
                     {EXTRACTED_SENTINEL}\n\
                     {{\"weapons\":[\"Knife\"],\"vehicleTypes\":[\"Motorbike\"],\
                     \"licensePlates\":[],\"suspectsCount\":2,\"facesDetected\":0,\
                     \"ocrText\":\"\",\"confidenceScore\":0.8}}"
                ))
                .await;
            report
                .generate_full_report(&db, &storage, &model)
                .await
                .unwrap();

            let report = db.fetch_report(&report.id).await.unwrap();
            assert_eq!(report.ai_report.status, AiStatus::Completed);
            assert_eq!(
                report.ai_report.full_report.as_deref(),
                Some("At approximately 21:40 two suspects on a motorbike approached the victim.")
            );
            assert_eq!(report.ai_report.extracted.weapons, vec!["Knife"]);
            assert_eq!(report.ai_report.extracted.suspects_count, Some(2));
        });
    }

    #[async_std::test]
    async fn failed_full_report_stores_placeholder() {
        database_test!(|db| async move {
            let (storage, _) = storage();
            let (model, responses) = model();
            let author = User::create(&db, "noor".to_string(), "Noor".to_string())
                .await
                .unwrap();

            responses.queue_response("Short summary.").await;
            let mut report = Report::create(&db, &storage, &model, &author, data(), vec![])
                .await
                .unwrap()
                .report;

            report.approve_summary(&db, &author, None).await.unwrap();

            // Queue exhausted, stage 2 fails outright
            report
                .generate_full_report(&db, &storage, &model)
                .await
                .unwrap();

            let report = db.fetch_report(&report.id).await.unwrap();
            assert_eq!(report.ai_report.status, AiStatus::Completed);
            assert_eq!(
                report.ai_report.full_report.as_deref(),
                Some("AI could not generate full report")
            );
        });
    }

    #[async_std::test]
    async fn comments_and_replies_are_author_deletable_only() {
        database_test!(|db| async move {
            let (storage, _) = storage();
            let (model, _) = model();
            let author = User::create(&db, "owner".to_string(), "Owner".to_string())
                .await
                .unwrap();

            let mut report = Report::create(&db, &storage, &model, &author, data(), vec![])
                .await
                .unwrap()
                .report;

            let comment = report.add_comment(&db, "commenter", "Saw this happen.").await.unwrap();
            let reply = report
                .add_reply(&db, "replier", &comment.id, "Same here.")
                .await
                .unwrap();

            let err = report
                .delete_reply(&db, "commenter", &comment.id, &reply.id)
                .await
                .unwrap_err();
            assert!(matches!(err.error_type, ErrorType::NotOwner));

            report
                .delete_reply(&db, "replier", &comment.id, &reply.id)
                .await
                .unwrap();

            let err = report
                .delete_comment(&db, "replier", &comment.id)
                .await
                .unwrap_err();
            assert!(matches!(err.error_type, ErrorType::NotOwner));

            report.delete_comment(&db, "commenter", &comment.id).await.unwrap();

            let report = db.fetch_report(&report.id).await.unwrap();
            assert!(report.comments.is_empty());
        });
    }

    #[async_std::test]
    async fn report_deletion_destroys_images() {
        database_test!(|db| async move {
            let (storage, objects) = storage();
            let (model, _) = model();
            let author = User::create(&db, "faiz".to_string(), "Faiz".to_string())
                .await
                .unwrap();

            let report = Report::create(
                &db,
                &storage,
                &model,
                &author,
                data(),
                vec![image("a.jpg"), image("b.jpg")],
            )
            .await
            .unwrap()
            .report;
            assert_eq!(objects.len().await, 2);

            let stranger = User::create(&db, "str".to_string(), "Stranger".to_string())
                .await
                .unwrap();
            assert!(report.delete(&db, &storage, &stranger).await.is_err());

            report.delete(&db, &storage, &author).await.unwrap();
            assert!(objects.is_empty().await);
            assert!(db.fetch_report(&report.id).await.is_err());

            let author = db.fetch_user(&author.id).await.unwrap();
            assert_eq!(author.posts_count, 0);
        });
    }
}
