//! Group management use case.

use std::sync::Arc;

use chrono::NaiveTime;
use ulid::Ulid;

use crate::domain::entities::Group;
use crate::domain::repositories::{GroupRepository, RepoResult};

pub struct ManageGroups {
    groups: Arc<dyn GroupRepository>,
}

impl ManageGroups {
    pub fn new(groups: Arc<dyn GroupRepository>) -> Self {
        Self { groups }
    }

    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        class_start_time: NaiveTime,
        late_threshold_minutes: i32,
        late_threshold_enabled: bool,
    ) -> RepoResult<Group> {
        let group = Group::new(
            name,
            description,
            class_start_time,
            late_threshold_minutes,
            late_threshold_enabled,
        );
        self.groups.save(&group).await?;
        Ok(group)
    }

    pub async fn get(&self, id: Ulid) -> RepoResult<Option<Group>> {
        self.groups.find_by_id(id).await
    }

    pub async fn list(&self) -> RepoResult<Vec<Group>> {
        self.groups.find_all().await
    }

    pub async fn update(&self, group: &Group) -> RepoResult<()> {
        self.groups.update(group).await
    }

    pub async fn delete(&self, id: Ulid) -> RepoResult<()> {
        self.groups.delete(id).await
    }
}
