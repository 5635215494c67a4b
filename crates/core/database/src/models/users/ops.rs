use vigil_result::Result;

use crate::User;

#[cfg(feature = "mongodb")]
mod mongodb;
mod reference;

#[async_trait]
pub trait AbstractUsers: Sync + Send {
    /// Insert a new user into the database
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Fetch a user from the database
    async fn fetch_user(&self, id: &str) -> Result<User>;

    /// Fetch a user from the database by their username
    async fn fetch_user_by_username(&self, username: &str) -> Result<User>;

    /// Fetch multiple users by their ids
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>>;

    /// Save a user, replacing the whole document
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Adjust a user's authored-report counter
    async fn adjust_posts_count(&self, id: &str, delta: i64) -> Result<()>;
}
