//! Member management use case.

use std::sync::Arc;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::domain::entities::Member;
use crate::domain::repositories::{MemberRepository, RepoResult};

pub struct ManageMembers {
    members: Arc<dyn MemberRepository>,
}

impl ManageMembers {
    pub fn new(members: Arc<dyn MemberRepository>) -> Self {
        Self { members }
    }

    pub async fn enroll(
        &self,
        group_id: Ulid,
        name: String,
        role: Option<String>,
        email: Option<String>,
        joined_at: NaiveDate,
    ) -> RepoResult<Member> {
        let member = Member::new(group_id, name, role, email, joined_at);
        self.members.save(&member).await?;
        Ok(member)
    }

    pub async fn get(&self, person_id: Ulid) -> RepoResult<Option<Member>> {
        self.members.find_by_person_id(person_id).await
    }

    pub async fn list_for_group(&self, group_id: Ulid) -> RepoResult<Vec<Member>> {
        self.members.find_by_group(group_id).await
    }

    pub async fn list_active(&self) -> RepoResult<Vec<Member>> {
        self.members.find_all_active().await
    }

    pub async fn update(&self, member: &Member) -> RepoResult<()> {
        self.members.update(member).await
    }

    pub async fn deactivate(&self, person_id: Ulid) -> RepoResult<()> {
        if let Some(mut member) = self.members.find_by_person_id(person_id).await? {
            member.active = false;
            self.members.update(&member).await?;
        }
        Ok(())
    }

    pub async fn delete(&self, person_id: Ulid) -> RepoResult<()> {
        self.members.delete(person_id).await
    }
}
