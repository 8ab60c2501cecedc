//! End-to-end tests against a real tonic server on an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use envoy_types::pb::envoy::service::discovery::v3 as discovery;
use envoy_types::pb::envoy::service::secret::v3::secret_discovery_service_client::SecretDiscoveryServiceClient;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::transport::{Channel, Server};
use tonic::{Code, Streaming};
use xds_sds::{
    CounterVersion, DiscoveryRequest, DiscoveryResponse, ErrorDetail, Lifecycle, ProstCodec,
    SdsCodec, SecretDiscovery, StaticResolver, SECRET_TYPE_URL,
};

const TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    lifecycle: Lifecycle,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl TestServer {
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpListenerStream::new(listener);

        let resolver = StaticResolver::new()
            .with_secret("one", "first")
            .with_secret("two", "second")
            .with_secret("three", "third");
        let sds = SecretDiscovery::builder(resolver)
            .with_version_policy(CounterVersion::new())
            .build();
        let lifecycle = sds.lifecycle().clone();

        let stopped = lifecycle.stopped();
        let handle = tokio::spawn(async move {
            Server::builder()
                .add_service(sds.into_server())
                .serve_with_incoming_shutdown(incoming, stopped)
                .await
        });

        Self {
            addr,
            lifecycle,
            handle,
        }
    }

    async fn client(&self) -> SecretDiscoveryServiceClient<Channel> {
        SecretDiscoveryServiceClient::connect(format!("http://{}", self.addr))
            .await
            .unwrap()
    }
}

/// One open `StreamSecrets` call.
struct SdsStream {
    requests: mpsc::Sender<discovery::DiscoveryRequest>,
    responses: Streaming<discovery::DiscoveryResponse>,
}

impl SdsStream {
    async fn open(server: &TestServer, first: DiscoveryRequest) -> Self {
        let (requests, rx) = mpsc::channel::<discovery::DiscoveryRequest>(16);
        requests.send(first.into()).await.unwrap();

        let responses = server
            .client()
            .await
            .stream_secrets(ReceiverStream::new(rx))
            .await
            .unwrap()
            .into_inner();

        Self {
            requests,
            responses,
        }
    }

    async fn send(&self, request: DiscoveryRequest) {
        self.requests.send(request.into()).await.unwrap();
    }

    async fn next(&mut self) -> Result<Option<DiscoveryResponse>, tonic::Status> {
        let message = tokio::time::timeout(TIMEOUT, self.responses.message())
            .await
            .expect("timed out waiting for a response");
        message.map(|response| response.map(DiscoveryResponse::from))
    }

    async fn next_response(&mut self) -> DiscoveryResponse {
        self.next()
            .await
            .unwrap()
            .expect("stream ended before a response arrived")
    }
}

fn secret_names(response: &DiscoveryResponse) -> Vec<String> {
    response
        .resources
        .iter()
        .map(|resource| ProstCodec.decode_secret(resource).unwrap().name)
        .collect()
}

/// A request for `three` that echoes the last nonce. Whatever response comes
/// next must be the one it triggered, so anything sent before it was silent.
fn follow_up(last: &DiscoveryResponse) -> DiscoveryRequest {
    DiscoveryRequest::new(["three"]).with_response_nonce(last.nonce.clone())
}

#[tokio::test]
async fn test_first_contact() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["one"])).await;

    let response = stream.next_response().await;
    assert!(!response.version_info.is_empty());
    assert!(!response.nonce.is_empty());
    assert_eq!(response.type_url, SECRET_TYPE_URL);
    assert_eq!(secret_names(&response), vec!["one"]);

    let secret = ProstCodec.decode_secret(&response.resources[0]).unwrap();
    assert_eq!(secret.payload, "first");
}

#[tokio::test]
async fn test_ack_is_silent() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["one"])).await;
    let first = stream.next_response().await;

    stream
        .send(
            DiscoveryRequest::new(["one"])
                .with_version_info(first.version_info.clone())
                .with_response_nonce(first.nonce.clone()),
        )
        .await;
    stream.send(follow_up(&first)).await;

    let next = stream.next_response().await;
    assert_eq!(secret_names(&next), vec!["three"]);
    assert_ne!(next.nonce, first.nonce);
}

#[tokio::test]
async fn test_stale_nonce_is_discarded() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["one"])).await;
    let first = stream.next_response().await;

    stream
        .send(DiscoveryRequest::new(["two"]).with_response_nonce("never-sent"))
        .await;
    stream.send(follow_up(&first)).await;

    let next = stream.next_response().await;
    assert_eq!(secret_names(&next), vec!["three"]);
}

#[tokio::test]
async fn test_nack_is_discarded() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["one"])).await;
    let first = stream.next_response().await;

    stream
        .send(
            DiscoveryRequest::new(["two"])
                .with_response_nonce(first.nonce.clone())
                .with_error_detail(ErrorDetail {
                    code: Code::InvalidArgument as i32,
                    message: "malformed secret".to_string(),
                }),
        )
        .await;
    stream.send(follow_up(&first)).await;

    let next = stream.next_response().await;
    assert_eq!(secret_names(&next), vec!["three"]);
}

#[tokio::test]
async fn test_multiple_resources_keep_order() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["one", "two"])).await;

    let response = stream.next_response().await;
    assert_eq!(secret_names(&response), vec!["one", "two"]);
}

#[tokio::test]
async fn test_new_version_request_gets_response() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["one"])).await;
    let first = stream.next_response().await;

    stream
        .send(
            DiscoveryRequest::new(["two"])
                .with_version_info("some-other-version")
                .with_response_nonce(first.nonce.clone()),
        )
        .await;

    let second = stream.next_response().await;
    assert_eq!(secret_names(&second), vec!["two"]);
    assert_ne!(second.version_info, first.version_info);
    assert_ne!(second.nonce, first.nonce);
}

#[tokio::test]
async fn test_fetch_secrets_twice() {
    let server = TestServer::spawn().await;
    let mut client = server.client().await;
    let request: discovery::DiscoveryRequest = DiscoveryRequest::new(["one", "two"])
        .with_version_info("versionInfo")
        .with_response_nonce("response-nonce")
        .into();

    let first = client
        .fetch_secrets(request.clone())
        .await
        .unwrap()
        .into_inner();
    let second = client.fetch_secrets(request).await.unwrap().into_inner();

    assert_ne!(first.nonce, second.nonce);
    for response in [first, second] {
        let response = DiscoveryResponse::from(response);
        assert!(!response.version_info.is_empty());
        assert_eq!(secret_names(&response), vec!["one", "two"]);
    }
}

#[tokio::test]
async fn test_fetch_secrets_unknown_name() {
    let server = TestServer::spawn().await;
    let mut client = server.client().await;

    let request = discovery::DiscoveryRequest::from(DiscoveryRequest::new(["missing"]));

    let status = client
        .fetch_secrets(request)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_unknown_secret_ends_stream_with_error() {
    let server = TestServer::spawn().await;
    let mut stream = SdsStream::open(&server, DiscoveryRequest::new(["missing"])).await;

    let status = stream.next().await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_delta_secrets_unimplemented() {
    let server = TestServer::spawn().await;
    let mut client = server.client().await;

    let requests: Vec<discovery::DeltaDiscoveryRequest> = Vec::new();

    let status = client
        .delta_secrets(tokio_stream::iter(requests))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
    assert_eq!(status.message(), "method DeltaSecrets not implemented");
}

#[tokio::test]
async fn test_stop_ends_idle_streams() {
    let server = TestServer::spawn().await;
    let mut first = SdsStream::open(&server, DiscoveryRequest::new(["one"])).await;
    let mut second = SdsStream::open(&server, DiscoveryRequest::new(["two"])).await;
    first.next_response().await;
    second.next_response().await;

    server.lifecycle.stop();

    assert!(first.next().await.unwrap().is_none());
    assert!(second.next().await.unwrap().is_none());
    drop((first, second));

    tokio::time::timeout(TIMEOUT, server.handle)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();
}
