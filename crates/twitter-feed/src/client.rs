use crate::auth::OAuthSigner;
use crate::model::{ApiResponse, Tweet, User};
use crate::prelude::*;
use crate::{http, Config, Credentials, FeedError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// How many recent posts a feed request asks for when the caller has no
/// opinion.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// A single post, projected down to what the viewer displays.
#[derive(Debug, Clone, Serialize)]
pub struct FeedTweet {
    pub text: String,
    pub created_at: String,
}

/// An authenticated handle to the feed provider.
///
/// A session is cheap state plus verified credentials: constructing one
/// performs a liveness check against the "who am I" endpoint, so a returned
/// session is known to hold credentials the provider accepts.
pub struct Session {
    http: http::Client,
    api_url: String,
    signer: OAuthSigner,
    bearer_token: Option<String>,
}

impl std::fmt::Debug for Session {
    /// Omits the signer and bearer token so credentials never reach logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_url", &self.api_url)
            .field("bearer_token", &self.bearer_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Which authentication a request goes out with.
enum RequestAuth {
    /// OAuth-signed user-context call.
    UserContext,
    /// Bearer token when one is configured, OAuth otherwise.
    Read,
}

impl Session {
    /// Authenticates against the feed provider.
    ///
    /// With a bearer token configured the session combines bearer and OAuth
    /// 1.0a authentication, otherwise it is OAuth-only. Credential rejection
    /// surfaces as [`FeedError::Authentication`], any other construction
    /// failure as [`FeedError::Connection`].
    pub async fn connect(config: &Config, credentials: Credentials) -> Result<Self> {
        let signer = OAuthSigner::new(&credentials)?;

        match &credentials.bearer_token {
            Some(_) => info!("using combined bearer token and OAuth 1.0a authentication"),
            None => info!("using OAuth 1.0a authentication"),
        }

        let session = Self {
            http: http::create_client(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            signer,
            bearer_token: credentials.bearer_token,
        };

        let me: ApiResponse<User> = session
            .get_json("/2/users/me", &[], RequestAuth::UserContext)
            .await
            .map_err(FeedError::from_connect)?;

        match me.data {
            Some(user) => {
                info!(user_id = %user.id, username = %user.username, "connected to the Twitter API")
            }
            None => info!("connected to the Twitter API"),
        }

        Ok(session)
    }

    /// Fetches up to `max_results` most recent posts of `username`.
    ///
    /// An account that exists but has nothing posted yields an empty vector,
    /// not an error.
    pub async fn fetch_user_feed(
        &self,
        username: &str,
        max_results: u32,
    ) -> Result<Vec<FeedTweet>> {
        info!(%username, "fetching the user's feed");

        let user = self.resolve_user(username).await?;

        let query = [
            ("max_results".to_owned(), max_results.to_string()),
            ("tweet.fields".to_owned(), "created_at,text".to_owned()),
        ];

        let response: ApiResponse<Vec<Tweet>> = self
            .get_json(
                &format!("/2/users/{}/tweets", user.id),
                &query,
                RequestAuth::Read,
            )
            .await
            .map_err(FeedError::from_fetch)?;

        let tweets = response.data.unwrap_or_default();

        info!(
            %username,
            count = tweets.len(),
            newest_id = tweets.first().map(|tweet| tweet.id.as_str()),
            "fetched the user's feed"
        );

        Ok(tweets
            .into_iter()
            .map(|tweet| FeedTweet {
                text: tweet.text,
                created_at: tweet.created_at.to_feed_timestamp(),
            })
            .collect())
    }

    async fn resolve_user(&self, username: &str) -> Result<User> {
        let response: ApiResponse<User> = self
            .get_json(
                &format!("/2/users/by/username/{username}"),
                &[],
                RequestAuth::Read,
            )
            .await
            .map_err(FeedError::from_fetch)?;

        response.data.ok_or_else(|| {
            let reasons: Vec<_> = response
                .errors
                .iter()
                .map(|error| error.message())
                .collect();

            warn!(%username, ?reasons, "user lookup came back empty");

            FeedError::UserNotFound {
                username: username.to_owned(),
            }
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        auth: RequestAuth,
    ) -> Result<T, crate::HttpClientError> {
        let url = format!("{}{}", self.api_url, path);

        let authorization = match (&auth, &self.bearer_token) {
            (RequestAuth::Read, Some(bearer)) => format!("Bearer {bearer}"),
            _ => self.signer.authorization_header("GET", &url, query),
        };

        self.http
            .get(&url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .read_json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpClientError;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(bearer_token: Option<&str>) -> Credentials {
        Credentials {
            api_key: "test-api-key".to_owned(),
            api_secret: "test-api-secret".to_owned(),
            access_token: Some("test-access-token".to_owned()),
            access_token_secret: Some("test-access-token-secret".to_owned()),
            bearer_token: bearer_token.map(str::to_owned),
        }
    }

    fn config(server: &MockServer) -> Config {
        Config {
            api_url: server.uri(),
        }
    }

    async fn mock_me(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "99", "name": "Feed Viewer", "username": "feedviewer"}
            })))
            .mount(server)
            .await;
    }

    async fn mock_user_lookup(server: &MockServer, username: &str, id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/2/users/by/username/{username}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": id, "name": "Some User", "username": username}
            })))
            .mount(server)
            .await;
    }

    async fn connect(server: &MockServer) -> Session {
        Session::connect(&config(server), credentials(None))
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn connect_performs_a_liveness_check() {
        let server = MockServer::start().await;
        mock_me(&server).await;

        connect(&server).await;

        // One request: the liveness check itself
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn connect_rejects_bad_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "title": "Unauthorized",
                "status": 401
            })))
            .mount(&server)
            .await;

        let err = Session::connect(&config(&server), credentials(None))
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Authentication { .. }), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn connect_distinguishes_network_failures() {
        // Bind and immediately drop a listener so the port is closed
        let closed_addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let config = Config {
            api_url: format!("http://{closed_addr}"),
        };

        let err = Session::connect(&config, credentials(None))
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Connection { .. }), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn connect_requires_a_complete_oauth_pair() {
        let mut incomplete = credentials(Some("test-bearer-token"));
        incomplete.access_token = None;
        incomplete.access_token_secret = None;

        let err = Session::connect(&Config::default(), incomplete)
            .await
            .unwrap_err();

        assert!(
            matches!(err, FeedError::MissingCredentials { .. }),
            "{err:?}"
        );
    }

    #[test_log::test(tokio::test)]
    async fn fetch_returns_formatted_tweets() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        mock_user_lookup(&server, "jack", "12").await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .and(query_param("max_results", "10"))
            .and(query_param("tweet.fields", "created_at,text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "2", "text": "just setting up my twttr", "created_at": "2023-05-01T15:30:45.000Z"},
                    {"id": "1", "text": "hello world", "created_at": "2023-04-30T08:05:00.000Z"}
                ],
                "meta": {"result_count": 2}
            })))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let tweets = session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap();

        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].text, "just setting up my twttr");
        assert_eq!(tweets[0].created_at, "2023-05-01 15:30:45");
        assert_eq!(tweets[1].created_at, "2023-04-30 08:05:00");
    }

    #[test_log::test(tokio::test)]
    async fn fetch_reports_unknown_users() {
        let server = MockServer::start().await;
        mock_me(&server).await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/nosuchuser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{
                    "title": "Not Found Error",
                    "detail": "Could not find user with username: [nosuchuser]."
                }]
            })))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let err = session
            .fetch_user_feed("nosuchuser", DEFAULT_MAX_RESULTS)
            .await
            .unwrap_err();

        assert!(
            matches!(&err, FeedError::UserNotFound { username } if username == "nosuchuser"),
            "{err:?}"
        );
        assert_eq!(err.to_string(), "user nosuchuser not found");
    }

    #[test_log::test(tokio::test)]
    async fn fetch_of_an_empty_timeline_is_not_an_error() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        mock_user_lookup(&server, "quietone", "77").await;

        Mock::given(method("GET"))
            .and(path("/2/users/77/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"result_count": 0}
            })))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let tweets = session
            .fetch_user_feed("quietone", DEFAULT_MAX_RESULTS)
            .await
            .unwrap();

        assert!(tweets.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn fetch_propagates_mid_operation_auth_rejection() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        mock_user_lookup(&server, "jack", "12").await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "title": "Unauthorized",
                "status": 401
            })))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let err = session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Authentication { .. }), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn fetch_maps_other_upstream_failures() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        mock_user_lookup(&server, "jack", "12").await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let err = session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Upstream { .. }), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn fetch_rejects_tweets_without_timestamps() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        mock_user_lookup(&server, "jack", "12").await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "1", "text": "no timestamp"}],
                "meta": {"result_count": 1}
            })))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let err = session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap_err();

        assert!(
            matches!(
                &err,
                FeedError::Upstream {
                    source: HttpClientError::UnexpectedResponseJsonShape { .. }
                }
            ),
            "{err:?}"
        );
    }

    #[test_log::test(tokio::test)]
    async fn fetch_waits_out_a_rate_limited_window() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        mock_user_lookup(&server, "jack", "12").await;

        // First attempt is rate-limited with a reset instant that has long
        // passed, so the client only waits its one second of slack
        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("x-rate-limit-reset", "1")
                    .set_body_json(json!({"title": "Too Many Requests", "status": 429})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "1", "text": "made it through", "created_at": "2023-05-01T15:30:45.000Z"}
                ],
                "meta": {"result_count": 1}
            })))
            .mount(&server)
            .await;

        let session = connect(&server).await;
        let tweets = session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap();

        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].text, "made it through");
    }

    #[test_log::test(tokio::test)]
    async fn bearer_token_is_preferred_for_reads() {
        let server = MockServer::start().await;
        mock_me(&server).await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/jack"))
            .and(header("Authorization", "Bearer test-bearer-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "12", "name": "Jack", "username": "jack"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/tweets"))
            .and(header("Authorization", "Bearer test-bearer-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"result_count": 0}
            })))
            .mount(&server)
            .await;

        let session = Session::connect(&config(&server), credentials(Some("test-bearer-token")))
            .await
            .unwrap();

        session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap();
    }

    #[test]
    fn feed_tweet_serialization() {
        let tweet = FeedTweet {
            text: "hello world".to_owned(),
            created_at: "2023-05-01 15:30:45".to_owned(),
        };

        let actual = serde_json::to_string_pretty(&tweet).unwrap();

        expect_test::expect![[r#"
            {
              "text": "hello world",
              "created_at": "2023-05-01 15:30:45"
            }"#]]
        .assert_eq(&actual);
    }

    #[test_log::test(tokio::test)]
    #[ignore]
    async fn manual_sandbox() {
        let _ = dotenvy::dotenv();

        let credentials = Credentials::from_env().unwrap();
        let session = Session::connect(&Config::default(), credentials)
            .await
            .unwrap();

        let tweets = session
            .fetch_user_feed("jack", DEFAULT_MAX_RESULTS)
            .await
            .unwrap();

        eprintln!("{tweets:#?}");
    }
}
