use std::{collections::HashMap, sync::Arc};

use futures::lock::Mutex;

use crate::{Report, User};

database_derived!(
    /// Reference implementation
    #[derive(Default)]
    pub struct ReferenceDb {
        pub users: Arc<Mutex<HashMap<String, User>>>,
        pub reports: Arc<Mutex<HashMap<String, Report>>>,
    }
);

impl ReferenceDb {
    /// Remove all data (used by the test harness)
    pub async fn clear(&self) {
        self.users.lock().await.clear();
        self.reports.lock().await.clear();
    }
}
