// rescue-client/src/api/admin.rs
// 管理后台接口 - 账号 / 救援队

use crate::ClientResult;
use crate::http::{ApiRequest, SessionPipeline};
use shared::ApiResponse;
use shared::models::{
    Account, AccountActiveUpdate, AccountCreate, AccountPage, RescueTeam, RescueTeamUpdate,
};

pub const ACCOUNTS_PATH: &str = "/api/admin/accounts";
pub const TEAMS_PATH: &str = "/api/rescue-teams";

/// Default page size of the account listing
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Account and team administration
#[derive(Debug, Clone)]
pub struct AdminApi {
    pipeline: SessionPipeline,
}

impl AdminApi {
    pub fn new(pipeline: SessionPipeline) -> Self {
        Self { pipeline }
    }

    // ========== Accounts ==========

    /// One page of accounts, newest first
    pub async fn list_accounts(
        &self,
        cursor: Option<&str>,
        limit: u32,
        search: &str,
    ) -> ClientResult<AccountPage> {
        let mut request = ApiRequest::get(ACCOUNTS_PATH).query("limit", limit);
        if let Some(cursor) = cursor {
            request = request.query("cursor", cursor);
        }
        if !search.is_empty() {
            request = request.query("search", search);
        }
        self.pipeline.execute_json(request).await
    }

    pub async fn create_account(&self, payload: &AccountCreate) -> ClientResult<()> {
        let request = ApiRequest::post(ACCOUNTS_PATH).json(payload)?;
        self.pipeline.execute_empty(request).await
    }

    /// Lock or unlock an account
    pub async fn set_account_active(&self, id: i64, is_active: bool) -> ClientResult<()> {
        let request = ApiRequest::patch(format!("{ACCOUNTS_PATH}/{id}/active"))
            .json(&AccountActiveUpdate { is_active })?;
        self.pipeline.execute_empty(request).await
    }

    // ========== Rescue teams ==========

    /// All teams; a missing `data` field yields an empty list
    pub async fn list_teams(&self) -> ClientResult<Vec<RescueTeam>> {
        let resp: ApiResponse<Vec<RescueTeam>> = self
            .pipeline
            .execute_json(ApiRequest::get(format!("{TEAMS_PATH}/")))
            .await?;
        Ok(resp.into_data_or_default())
    }

    pub async fn update_team(&self, id: &str, payload: &RescueTeamUpdate) -> ClientResult<()> {
        let request = ApiRequest::patch(format!("{TEAMS_PATH}/{id}")).json(payload)?;
        self.pipeline.execute_empty(request).await
    }

    pub async fn delete_team(&self, id: &str) -> ClientResult<()> {
        self.pipeline
            .execute_empty(ApiRequest::delete(format!("{TEAMS_PATH}/{id}")))
            .await
    }
}

/// Load-more pagination over the account listing
///
/// Keeps the accumulated items and the server cursor. A new search resets
/// both; `load_more` appends the next page until the cursor runs out.
#[derive(Debug)]
pub struct AccountCursor {
    api: AdminApi,
    search: String,
    limit: u32,
    items: Vec<Account>,
    next_cursor: Option<String>,
    has_more: bool,
}

impl AccountCursor {
    pub fn new(api: AdminApi) -> Self {
        Self {
            api,
            search: String::new(),
            limit: DEFAULT_PAGE_SIZE,
            items: Vec::new(),
            next_cursor: None,
            has_more: true,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn items(&self) -> &[Account] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Start over with a new search term
    pub async fn search(&mut self, term: &str) -> ClientResult<&[Account]> {
        self.search = term.to_string();
        self.next_cursor = None;
        let page = self.api.list_accounts(None, self.limit, &self.search).await?;
        self.items = page.items;
        self.advance(page.next_cursor);
        Ok(&self.items)
    }

    /// Reload the first page of the current search
    pub async fn refresh(&mut self) -> ClientResult<&[Account]> {
        let term = self.search.clone();
        self.search(&term).await
    }

    /// Append the next page; no request once the listing is exhausted
    pub async fn load_more(&mut self) -> ClientResult<&[Account]> {
        if !self.has_more {
            return Ok(&self.items);
        }
        let page = self
            .api
            .list_accounts(self.next_cursor.as_deref(), self.limit, &self.search)
            .await?;
        self.items.extend(page.items);
        self.advance(page.next_cursor);
        Ok(&self.items)
    }

    fn advance(&mut self, next: Option<String>) {
        self.has_more = next.is_some();
        self.next_cursor = next;
    }
}
