//! Verification request service
//!
//! Users file requests to get their account verified; admins review them.

use chrono::Utc;
use std::sync::Arc;

use super::error::{authorize, ContentError};
use crate::access::{Collection, Operation};
use crate::db::repositories::{MediaRepository, VerificationRepository};
use crate::models::{
    CreateVerificationInput, ListParams, PagedResult, UpdateVerificationInput, User,
    VerificationRequest,
};

const LABEL: &str = "Verification request";

pub struct VerificationService {
    repo: Arc<dyn VerificationRepository>,
    media: Arc<dyn MediaRepository>,
}

impl VerificationService {
    pub fn new(repo: Arc<dyn VerificationRepository>, media: Arc<dyn MediaRepository>) -> Self {
        Self { repo, media }
    }

    /// File a request on behalf of the requester
    pub async fn create(
        &self,
        input: CreateVerificationInput,
        requester: Option<&User>,
    ) -> Result<VerificationRequest, ContentError> {
        authorize(Collection::VerificationRequests, Operation::Create, requester)?;
        let user = requester.ok_or(ContentError::Unauthorized)?;

        self.check_document(input.document_id, user).await?;

        let notes = input.notes.as_deref().filter(|n| !n.trim().is_empty());
        let request = self.repo.create(user.id, input.document_id, notes).await?;
        tracing::info!(id = request.id, user_id = user.id, "Filed verification request");
        Ok(request)
    }

    pub async fn get(
        &self,
        id: i64,
        requester: Option<&User>,
    ) -> Result<VerificationRequest, ContentError> {
        let filter = authorize(Collection::VerificationRequests, Operation::Read, requester)?;
        self.repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound(LABEL))
    }

    pub async fn list(
        &self,
        requester: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<VerificationRequest>, ContentError> {
        let filter = authorize(Collection::VerificationRequests, Operation::Read, requester)?;
        let (docs, total) = self.repo.list(&filter, params).await?;
        Ok(PagedResult::new(docs, total, params))
    }

    /// Review a request. Leaving `pending` stamps the reviewer and time.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateVerificationInput,
        requester: Option<&User>,
    ) -> Result<VerificationRequest, ContentError> {
        let filter = authorize(Collection::VerificationRequests, Operation::Update, requester)?;
        let reviewer = requester.ok_or(ContentError::Unauthorized)?;

        let mut request = self
            .repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound(LABEL))?;

        if input.document_id.is_some() {
            self.check_document(input.document_id, reviewer).await?;
        }

        let previous = request.status;
        request.apply_update(input, reviewer.id, Utc::now());
        let updated = self.repo.update(&request).await?;

        if updated.status != previous {
            tracing::info!(
                id,
                reviewer = reviewer.id,
                status = %updated.status,
                "Reviewed verification request"
            );
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, requester: Option<&User>) -> Result<(), ContentError> {
        let filter = authorize(Collection::VerificationRequests, Operation::Delete, requester)?;
        if self.repo.find(id, &filter).await?.is_none() || !self.repo.delete(id).await? {
            return Err(ContentError::NotFound(LABEL));
        }
        Ok(())
    }

    /// An attached document must be media the user can read
    async fn check_document(&self, document_id: Option<i64>, user: &User) -> Result<(), ContentError> {
        let Some(id) = document_id else {
            return Ok(());
        };
        let readable = match Collection::Media.access(Operation::Read, Some(user)).filter() {
            Some(filter) => self.media.find(id, &filter).await?.is_some(),
            None => false,
        };
        if !readable {
            return Err(ContentError::ValidationError(format!("Unknown document: {}", id)));
        }
        Ok(())
    }
}
