use vigil_result::Result;

use crate::ReferenceDb;
use crate::User;

use super::AbstractUsers;

#[async_trait]
impl AbstractUsers for ReferenceDb {
    /// Insert a new user into the database
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.id) {
            Err(create_database_error!("insert", "users"))
        } else {
            users.insert(user.id.to_string(), user.clone());
            Ok(())
        }
    }

    /// Fetch a user from the database
    async fn fetch_user(&self, id: &str) -> Result<User> {
        let users = self.users.lock().await;
        users
            .get(id)
            .cloned()
            .ok_or_else(|| create_error!(UnknownUser))
    }

    /// Fetch a user from the database by their username
    async fn fetch_user_by_username(&self, username: &str) -> Result<User> {
        let users = self.users.lock().await;
        users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or_else(|| create_error!(UnknownUser))
    }

    /// Fetch multiple users by their ids
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        let users = self.users.lock().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    /// Save a user, replacing the whole document
    async fn save_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().await;
        users.insert(user.id.to_string(), user.clone());
        Ok(())
    }

    /// Adjust a user's authored-report counter
    async fn adjust_posts_count(&self, id: &str, delta: i64) -> Result<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(id) {
            user.posts_count += delta;
            Ok(())
        } else {
            Err(create_error!(UnknownUser))
        }
    }
}
