use vigil_result::Result;

use crate::MongoDb;
use crate::User;

use super::AbstractUsers;

static COL: &str = "users";

#[async_trait]
impl AbstractUsers for MongoDb {
    /// Insert a new user into the database
    async fn insert_user(&self, user: &User) -> Result<()> {
        query!(self, insert_one, COL, user).map(|_| ())
    }

    /// Fetch a user from the database
    async fn fetch_user(&self, id: &str) -> Result<User> {
        query!(self, find_one_by_id, COL, id)?.ok_or_else(|| create_error!(UnknownUser))
    }

    /// Fetch a user from the database by their username
    async fn fetch_user_by_username(&self, username: &str) -> Result<User> {
        query!(
            self,
            find_one,
            COL,
            doc! {
                "username": username
            }
        )?
        .ok_or_else(|| create_error!(UnknownUser))
    }

    /// Fetch multiple users by their ids
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        query!(
            self,
            find,
            COL,
            doc! {
                "_id": {
                    "$in": ids
                }
            }
        )
    }

    /// Save a user, replacing the whole document
    async fn save_user(&self, user: &User) -> Result<()> {
        query!(self, replace_one_by_id, COL, &user.id, user).map(|_| ())
    }

    /// Adjust a user's authored-report counter
    async fn adjust_posts_count(&self, id: &str, delta: i64) -> Result<()> {
        query!(
            self,
            update_one_raw,
            COL,
            doc! {
                "_id": id
            },
            doc! {
                "$inc": {
                    "posts_count": delta
                }
            }
        )
        .map(|_| ())
    }
}
