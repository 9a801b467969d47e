// rescue-client/tests/dispatch_integration.rs
// 集成测试 - 救援请求列表 / 附近队伍 / 指派

mod common;

use common::{PASSWORD, TestBackend};
use rescue_client::{CredentialStore, ErrorKind, RescueStatus};
use shared::models::{AssignTeam, RescueFilter};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_request_table_filters_and_pages() {
    let backend = TestBackend::start().await;
    let client = backend.client();
    client.auth().login("ops@rescue.example", PASSWORD).await.unwrap();
    let rescue = client.rescue();

    let page = rescue
        .list_requests(&RescueFilter::default().status("PENDING"))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 1);
    assert!(page.items.iter().all(|r| r.status == RescueStatus::Pending));
    assert!(page.items.iter().all(|r| !r.is_assigned()));

    let mut filter = RescueFilter::default().page(2);
    filter.page_size = 2;
    let page = rescue.list_requests(&filter).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.page_count(), 2);
    assert_eq!(page.items.len(), 1);
    let assignment = page.items[0].active_assignment.as_ref().unwrap();
    assert_eq!(assignment.team_name.as_deref(), Some("Team Alpha"));

    let queries = backend.state.request_queries.lock();
    assert_eq!(queries[0].get("status").map(String::as_str), Some("PENDING"));
    assert!(!queries[0].contains_key("search"));
    assert_eq!(queries[1].get("page").map(String::as_str), Some("2"));
    assert_eq!(queries[1].get("page_size").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_status_change_and_dispatch() {
    let backend = TestBackend::start().await;
    let client = backend.client();
    client.auth().login("ops@rescue.example", PASSWORD).await.unwrap();
    let rescue = client.rescue();

    rescue.update_status("r1", "CANCELLED").await.unwrap();
    assert_eq!(
        *backend.state.status_updates.lock(),
        vec![("r1".to_string(), "CANCELLED".to_string())]
    );

    let teams = rescue.find_nearby_teams(10.76, 106.66, None).await.unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].id, "t1");
    assert!(teams[0].distance < teams[1].distance);
    assert_eq!(
        backend.state.team_queries.lock()[0].get("radius_km").map(String::as_str),
        Some("20")
    );

    let result = rescue
        .assign_team(&AssignTeam {
            request_id: "r1".into(),
            rescue_team_id: teams[0].id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(result.task_id.as_deref(), Some("task-r1"));
    assert_eq!(
        *backend.state.assignments.lock(),
        vec![("r1".to_string(), "t1".to_string())]
    );

    // Rejected dispatch surfaces as an HTTP error, not a renewal
    let err = rescue
        .assign_team(&AssignTeam {
            request_id: "missing".into(),
            rescue_team_id: "t1".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(backend.state.assignments.lock().len(), 1);
}

#[tokio::test]
async fn test_dispatch_calls_renew_expired_token() {
    let backend = TestBackend::start().await;
    let client = backend.client();
    client.auth().login("ops@rescue.example", PASSWORD).await.unwrap();
    backend.state.expire();

    let page = client.rescue().list_requests(&RescueFilter::default()).await.unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(backend.state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.credentials().access_token().as_deref(), Some("T2"));

    // The refresh cookie is gone after logout
    client.auth().logout().await.unwrap();
    let err = client
        .rescue()
        .find_nearby_teams(10.0, 106.0, Some(5.0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Renewal, "{err:?}");
    assert_eq!(backend.state.refresh_calls.load(Ordering::SeqCst), 2);
}
