use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::transport::{Envelope, Request, TransportClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token issued by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds as reported by the server; informational only.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<Value>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Login and logout against the session held by a [`TransportClient`].
pub struct AuthApi<'a> {
    client: &'a TransportClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a TransportClient) -> Self {
        Self { client }
    }

    /// Authenticate and store the returned token.
    ///
    /// A rejected login publishes `Unauthorized` through the transport client.
    pub async fn login(&self, email: &str, password: &str) -> Envelope<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let req = Request::post(self.client.login_path(), self.client.bounded()).json(&body);
        let envelope: Envelope<LoginResponse> = self.client.request_json(req).await;
        if let Some(token) = envelope.data.as_ref().map(|t| t.access_token.clone()) {
            self.client.session().tokens.set(token);
            info!(email, "logged in");
        }
        envelope
    }

    /// Forget the local token. Never touches the network.
    pub fn logout(&self) -> Envelope<()> {
        self.client.session().tokens.clear();
        info!("logged out");
        Envelope::local(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::{Session, SessionEvent};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> TransportClient {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        TransportClient::new(&config, Session::default()).unwrap()
    }

    #[tokio::test]
    async fn login_stores_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "admin@compliai.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-123",
                "token_type": "bearer",
                "expires_in": 604800,
                "user": {"email": "admin@compliai.com"}
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let env = AuthApi::new(&client).login("admin@compliai.com", "pw").await;

        assert!(env.success);
        assert_eq!(env.data.unwrap().expires_in, Some(604800));
        assert_eq!(client.session().tokens.get().as_deref(), Some("jwt-123"));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid email or password"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let mut events = client.session().events.subscribe();
        let env = AuthApi::new(&client).login("x@y.z", "wrong").await;

        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Invalid email or password"));
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Unauthorized);
    }

    #[test]
    fn logout_is_local() {
        let client = client("http://127.0.0.1:9");
        client.session().tokens.set("t");
        let env = AuthApi::new(&client).logout();
        assert!(env.success);
        assert_eq!(client.session().tokens.get(), None);
    }
}
