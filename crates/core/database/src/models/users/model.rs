use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use ulid::Ulid;
use vigil_files::StoredImage;
use vigil_result::Result;

use crate::Database;

auto_derived!(
    /// Decimal-degree coordinate pair
    #[derive(Copy)]
    pub struct Coordinates {
        pub lat: f64,
        pub lng: f64,
    }

    /// # User
    pub struct User {
        /// Unique Id
        #[serde(rename = "_id")]
        pub id: String,
        /// Username
        pub username: String,
        /// Display name
        pub name: String,

        /// Free-text home location, e.g. "F-8, Islamabad"
        #[serde(skip_serializing_if = "Option::is_none")]
        pub location: Option<String>,
        /// Home coordinates, used for proximity scoring
        #[serde(skip_serializing_if = "Option::is_none")]
        pub coordinates: Option<Coordinates>,
        /// Profile text
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub bio: String,
        /// Profile picture
        #[serde(skip_serializing_if = "Option::is_none")]
        pub profile_picture: Option<StoredImage>,
        /// Banner picture
        #[serde(skip_serializing_if = "Option::is_none")]
        pub banner_picture: Option<StoredImage>,

        /// Users following this user
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub followers: IndexSet<String>,
        /// Users this user follows
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub following: IndexSet<String>,

        /// Number of reports this user has authored
        #[serde(default)]
        pub posts_count: i64,
        /// Whether this user's identity is verified
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub verified: bool,
        /// Whether this user is privileged
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub privileged: bool,

        /// When this user registered
        #[serde(with = "crate::util::datetime")]
        pub created_at: DateTime<Utc>,
    }
);

impl Default for User {
    fn default() -> Self {
        Self {
            id: Ulid::new().to_string(),
            username: Default::default(),
            name: Default::default(),
            location: None,
            coordinates: None,
            bio: Default::default(),
            profile_picture: None,
            banner_picture: None,
            followers: Default::default(),
            following: Default::default(),
            posts_count: 0,
            verified: false,
            privileged: false,
            created_at: Utc::now(),
        }
    }
}

impl User {
    /// Create a new user
    pub async fn create(db: &Database, username: String, name: String) -> Result<User> {
        if db.fetch_user_by_username(&username).await.is_ok() {
            return Err(create_error!(UsernameTaken));
        }

        let user = User {
            username,
            name,
            ..Default::default()
        };

        db.insert_user(&user).await?;
        Ok(user)
    }

    /// Follow another user
    ///
    /// Keeps the follower / following sets symmetric: the target's
    /// followers are updated in the same operation. Idempotent.
    pub async fn follow(&mut self, db: &Database, target: &mut User) -> Result<()> {
        if self.id == target.id {
            return Err(create_error!(CannotFollowYourself));
        }

        self.following.insert(target.id.clone());
        target.followers.insert(self.id.clone());

        db.save_user(self).await?;
        db.save_user(target).await
    }

    /// Unfollow another user
    pub async fn unfollow(&mut self, db: &Database, target: &mut User) -> Result<()> {
        self.following.shift_remove(&target.id);
        target.followers.shift_remove(&self.id);

        db.save_user(self).await?;
        db.save_user(target).await
    }
}
