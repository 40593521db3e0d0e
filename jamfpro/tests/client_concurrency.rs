//! Shared client behaviour under concurrent callers

use futures::future::join_all;
use jamfpro::api::Client;
use mockito::Server;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_token() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/api/oauth/token")
        .with_body(r#"{"access_token":"shared","expires_in":1200}"#)
        .expect(1)
        .create_async()
        .await;
    let department = server
        .mock("GET", "/api/v1/departments/1")
        .match_header("authorization", "Bearer shared")
        .with_body(r#"{"id":"1","name":"Engineering"}"#)
        .expect(8)
        .create_async()
        .await;

    let client = Client::new(&server.url(), "client", "secret").unwrap();
    let requests = (0..8).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.departments().get("1").await })
    });

    for result in join_all(requests).await {
        let department = tokio_test::assert_ok!(result.unwrap());
        assert_eq!(department.name, "Engineering");
    }

    token.assert_async().await;
    department.assert_async().await;
}
