use std::collections::HashMap;

use chrono::{DateTime, Utc};
use vigil_result::Result;

use crate::util::geo::haversine_km;
use crate::{AiStatus, Comment, Coordinates, Database, Reply, Report, User, Vote};

/// Page size used when the caller does not supply one
pub const DEFAULT_FEED_LIMIT: usize = 10;

auto_derived!(
    /// Feed request parameters
    #[derive(Default)]
    pub struct FeedParams {
        /// Only consider reports created strictly before this instant
        #[serde(skip_serializing_if = "Option::is_none")]
        pub cursor: Option<DateTime<Utc>>,
        /// Page size
        #[serde(skip_serializing_if = "Option::is_none")]
        pub limit: Option<usize>,
    }

    /// One page of a personalized feed
    pub struct FeedPage {
        pub feed: Vec<ReportView>,
        /// Cursor for the next page, if one exists
        #[serde(skip_serializing_if = "Option::is_none")]
        pub next_cursor: Option<DateTime<Utc>>,
        pub has_more: bool,
    }

    /// Report annotated for a specific viewer
    pub struct ReportView {
        pub id: String,
        pub author: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        pub images: Vec<String>,
        pub category: String,
        pub date: String,
        pub time: String,
        pub location_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub coordinates: Option<Coordinates>,
        pub anonymous: bool,
        pub created_at: DateTime<Utc>,

        pub likes: usize,
        pub upvotes: usize,
        pub downvotes: usize,
        /// The viewer's current vote on this report
        pub user_vote: Option<Vote>,
        /// Whether the viewer authored this report
        pub is_owner: bool,
        /// Relevance score this report was ranked with, when scored
        #[serde(skip_serializing_if = "Option::is_none")]
        pub relevance_score: Option<i32>,

        pub ai_status: AiStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub short_summary: Option<String>,

        pub comments: Vec<CommentView>,
    }

    /// Comment annotated for a specific viewer
    pub struct CommentView {
        pub id: String,
        pub author: String,
        pub text: String,
        pub created_at: DateTime<Utc>,
        pub upvotes: usize,
        pub downvotes: usize,
        pub user_vote: Option<Vote>,
        pub is_owner: bool,
        pub replies: Vec<ReplyView>,
    }

    /// Reply annotated for a specific viewer
    pub struct ReplyView {
        pub id: String,
        pub author: String,
        pub text: String,
        pub created_at: DateTime<Utc>,
        pub upvotes: usize,
        pub downvotes: usize,
        pub user_vote: Option<Vote>,
        pub is_owner: bool,
    }
);

/// Relevance score of a report for a given viewer
///
/// Integer point accumulation over independent signals. The location-text
/// and coordinate-distance bonuses can both apply when the viewer and the
/// author share a city and both carry coordinates; the original system
/// double-rewards this case and the behaviour is kept.
pub fn score_report(
    viewer: &User,
    report: &Report,
    author: Option<&User>,
    now: DateTime<Utc>,
) -> i32 {
    let mut score = 0;

    if viewer.following.contains(&report.author) {
        score += 3;
    }

    if let Some(author) = author {
        if let (Some(mine), Some(theirs)) = (&viewer.location, &author.location) {
            if mine.eq_ignore_ascii_case(theirs) {
                score += 2;
            }
        }

        if let (Some(mine), Some(theirs)) = (&viewer.coordinates, &author.coordinates) {
            let distance_km = haversine_km(mine, theirs);
            if distance_km < 5.0 {
                score += 3;
            } else if distance_km < 20.0 {
                score += 2;
            } else if distance_km < 50.0 {
                score += 1;
            }
        }
    }

    let age_hours = (now - report.created_at).num_seconds() as f64 / 3600.0;
    if age_hours < 24.0 {
        score += 2;
    } else if age_hours < 72.0 {
        score += 1;
    }

    let engagement = report.likes.len() as i64 + report.votes.upvotes.len() as i64
        - report.votes.downvotes.len() as i64
        + report.comments.len() as i64;
    if engagement > 20 {
        score += 2;
    } else if engagement > 5 {
        score += 1;
    }

    score
}

impl Reply {
    fn into_view(self, viewer: &str) -> ReplyView {
        ReplyView {
            user_vote: self.votes.vote_of(viewer),
            is_owner: self.author == viewer,
            upvotes: self.votes.upvotes.len(),
            downvotes: self.votes.downvotes.len(),
            id: self.id,
            author: self.author,
            text: self.text,
            created_at: self.created_at,
        }
    }
}

impl Comment {
    fn into_view(self, viewer: &str) -> CommentView {
        CommentView {
            user_vote: self.votes.vote_of(viewer),
            is_owner: self.author == viewer,
            upvotes: self.votes.upvotes.len(),
            downvotes: self.votes.downvotes.len(),
            replies: self
                .replies
                .into_iter()
                .map(|reply| reply.into_view(viewer))
                .collect(),
            id: self.id,
            author: self.author,
            text: self.text,
            created_at: self.created_at,
        }
    }
}

impl Report {
    /// Annotate this report for a viewer
    pub fn into_view(self, viewer: &str, relevance_score: Option<i32>) -> ReportView {
        ReportView {
            user_vote: self.votes.vote_of(viewer),
            is_owner: self.author == viewer,
            likes: self.likes.len(),
            upvotes: self.votes.upvotes.len(),
            downvotes: self.votes.downvotes.len(),
            relevance_score,
            ai_status: self.ai_report.status,
            short_summary: self.ai_report.short_summary,
            comments: self
                .comments
                .into_iter()
                .map(|comment| comment.into_view(viewer))
                .collect(),
            images: self.images.into_iter().map(|image| image.url).collect(),
            id: self.id,
            author: self.author,
            description: self.description,
            category: self.category,
            date: self.date,
            time: self.time,
            location_text: self.location_text,
            coordinates: self.coordinates,
            anonymous: self.anonymous,
            created_at: self.created_at,
        }
    }

    /// Build one page of the personalized feed for a viewer
    ///
    /// Fetches one candidate beyond the page size to detect further pages.
    /// Candidates are scored and stably re-ordered by descending relevance;
    /// the cursor stays in pre-scoring (creation time) order so that
    /// following it never skips or repeats a report.
    pub async fn personalized_feed(
        db: &Database,
        viewer_id: &str,
        params: FeedParams,
    ) -> Result<FeedPage> {
        let viewer = db.fetch_user(viewer_id).await?;
        let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT).max(1);

        let candidates = db
            .fetch_reports_before(params.cursor, limit as i64 + 1)
            .await?;

        let has_more = candidates.len() > limit;
        let next_cursor = has_more.then(|| candidates[limit - 1].created_at);

        let mut author_ids: Vec<String> =
            candidates.iter().map(|report| report.author.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, User> = db
            .fetch_users(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        let now = Utc::now();
        let mut scored: Vec<(Report, i32)> = candidates
            .into_iter()
            .map(|report| {
                let score = score_report(&viewer, &report, authors.get(&report.author), now);
                (report, score)
            })
            .collect();

        // Stable sort; equal scores keep their newest-first order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let feed = scored
            .into_iter()
            .take(limit)
            .map(|(report, score)| report.into_view(&viewer.id, Some(score)))
            .collect();

        Ok(FeedPage {
            feed,
            next_cursor,
            has_more,
        })
    }

    /// A user's reports annotated for a viewer, newest first
    pub async fn fetch_views_by_username(
        db: &Database,
        username: &str,
        viewer_id: &str,
    ) -> Result<Vec<ReportView>> {
        let user = db.fetch_user_by_username(username).await?;
        let reports = db.fetch_reports_by_author(&user.id).await?;

        Ok(reports
            .into_iter()
            .map(|report| report.into_view(viewer_id, None))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use ulid::Ulid;

    use super::score_report;
    use crate::{Comment, Coordinates, FeedParams, Report, User, Vote};

    fn viewer() -> User {
        User {
            username: "viewer".to_string(),
            location: Some("Islamabad".to_string()),
            coordinates: Some(Coordinates {
                lat: 33.7,
                lng: 73.1,
            }),
            ..Default::default()
        }
    }

    fn comment(author: &str) -> Comment {
        Comment {
            id: Ulid::new().to_string(),
            author: author.to_string(),
            text: "Noted.".to_string(),
            votes: Default::default(),
            replies: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn all_signals_accumulate() {
        let mut viewer = viewer();
        let author = User {
            username: "author".to_string(),
            location: Some("islamabad".to_string()),
            coordinates: Some(Coordinates {
                lat: 33.7,
                lng: 73.1,
            }),
            ..Default::default()
        };
        viewer.following.insert(author.id.clone());

        let now = Utc::now();
        let mut report = Report {
            author: author.id.clone(),
            created_at: now - Duration::hours(2),
            ..Default::default()
        };
        for n in 0..10 {
            report.votes.upvotes.insert(format!("u{n}"));
        }
        report.comments.push(comment("u0"));
        report.comments.push(comment("u1"));

        // follow 3 + location 2 + distance 3 + recency 2 + engagement 1
        assert_eq!(score_report(&viewer, &report, Some(&author), now), 11);
    }

    #[test]
    fn following_adds_exactly_three() {
        let mut viewer = viewer();
        let author = User::default();

        let now = Utc::now();
        let report = Report {
            author: author.id.clone(),
            created_at: now - Duration::hours(100),
            ..Default::default()
        };

        let before = score_report(&viewer, &report, Some(&author), now);
        viewer.following.insert(author.id.clone());
        let after = score_report(&viewer, &report, Some(&author), now);
        assert_eq!(after - before, 3);
    }

    #[test]
    fn distance_bands_decay() {
        let viewer = viewer();
        let now = Utc::now();
        let report = Report {
            created_at: now - Duration::hours(100),
            ..Default::default()
        };

        let mut author = User {
            coordinates: Some(Coordinates {
                lat: 33.7,
                lng: 73.1,
            }),
            ..Default::default()
        };
        assert_eq!(score_report(&viewer, &report, Some(&author), now), 3);

        // Roughly 11 km east
        author.coordinates = Some(Coordinates {
            lat: 33.7,
            lng: 73.22,
        });
        assert_eq!(score_report(&viewer, &report, Some(&author), now), 2);

        // Roughly 33 km east
        author.coordinates = Some(Coordinates {
            lat: 33.7,
            lng: 73.46,
        });
        assert_eq!(score_report(&viewer, &report, Some(&author), now), 1);

        // Far outside every band
        author.coordinates = Some(Coordinates {
            lat: 31.5,
            lng: 74.3,
        });
        assert_eq!(score_report(&viewer, &report, Some(&author), now), 0);
    }

    #[async_std::test]
    async fn feed_ranks_followed_authors_first() {
        database_test!(|db| async move {
            let mut viewer = User::create(&db, "viewer".to_string(), "Viewer".to_string())
                .await
                .unwrap();
            let mut friend = User::create(&db, "friend".to_string(), "Friend".to_string())
                .await
                .unwrap();
            let stranger = User::create(&db, "stranger".to_string(), "Stranger".to_string())
                .await
                .unwrap();

            viewer.follow(&db, &mut friend).await.unwrap();

            let now = Utc::now();
            let friend_report = Report {
                author: friend.id.clone(),
                created_at: now - Duration::hours(30),
                ..Default::default()
            };
            let mut stranger_report = Report {
                author: stranger.id.clone(),
                created_at: now - Duration::hours(1),
                ..Default::default()
            };
            stranger_report
                .votes
                .upvotes
                .insert(viewer.id.clone());

            db.insert_report(&friend_report).await.unwrap();
            db.insert_report(&stranger_report).await.unwrap();

            let page = Report::personalized_feed(&db, &viewer.id, FeedParams::default())
                .await
                .unwrap();

            // follow 3 + recency 1 beats recency 2
            assert_eq!(page.feed.len(), 2);
            assert_eq!(page.feed[0].id, friend_report.id);
            assert_eq!(page.feed[0].relevance_score, Some(4));
            assert_eq!(page.feed[1].relevance_score, Some(2));
            assert_eq!(page.feed[1].user_vote, Some(Vote::Upvote));
            assert!(!page.has_more);
            assert!(page.next_cursor.is_none());
        });
    }

    #[async_std::test]
    async fn equal_scores_stay_newest_first() {
        database_test!(|db| async move {
            let viewer = User::create(&db, "viewer".to_string(), "Viewer".to_string())
                .await
                .unwrap();

            let now = Utc::now();
            let older = Report {
                created_at: now - Duration::hours(2),
                ..Default::default()
            };
            let newer = Report {
                created_at: now - Duration::hours(1),
                ..Default::default()
            };
            db.insert_report(&older).await.unwrap();
            db.insert_report(&newer).await.unwrap();

            let page = Report::personalized_feed(&db, &viewer.id, FeedParams::default())
                .await
                .unwrap();
            assert_eq!(page.feed[0].id, newer.id);
            assert_eq!(page.feed[1].id, older.id);
        });
    }

    #[async_std::test]
    async fn cursor_walks_every_report_exactly_once() {
        database_test!(|db| async move {
            let viewer = User::create(&db, "viewer".to_string(), "Viewer".to_string())
                .await
                .unwrap();

            let base = Utc::now();
            let mut all_ids = Vec::new();
            for n in 0..25 {
                let report = Report {
                    created_at: base - Duration::minutes(n),
                    ..Default::default()
                };
                all_ids.push(report.id.clone());
                db.insert_report(&report).await.unwrap();
            }

            let mut seen = Vec::new();
            let mut cursor = None;
            let mut pages = 0;
            loop {
                let page = Report::personalized_feed(
                    &db,
                    &viewer.id,
                    FeedParams {
                        cursor,
                        limit: Some(10),
                    },
                )
                .await
                .unwrap();

                pages += 1;
                seen.extend(page.feed.into_iter().map(|view| view.id));
                assert_eq!(page.has_more, page.next_cursor.is_some());

                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }

            assert_eq!(pages, 3);
            assert_eq!(seen.len(), 25);

            let mut deduped = seen.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(deduped.len(), 25);

            let mut expected = all_ids;
            expected.sort();
            assert_eq!(deduped, expected);
        });
    }

    #[async_std::test]
    async fn unknown_viewer_is_rejected() {
        database_test!(|db| async move {
            assert!(
                Report::personalized_feed(&db, "01H00000000000000000000000", FeedParams::default())
                    .await
                    .is_err()
            );
        });
    }
}
