//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::settings::Settings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

const OFFLINE: &str = "Could not connect to GitHub. Do make sure you are connected to the internet.";

/// GitHub service using reqwest
pub struct GitHubService {
    client: Client,
    raw_url: String,
    api_url: String,
    status_url: String,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Deserialize)]
struct StatusPage {
    components: Vec<Component>,
}

#[derive(Deserialize)]
struct Component {
    name: String,
    status: String,
}

impl GitHubService {
    /// Create a service talking to the endpoints in `settings`
    pub fn new(settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .user_agent(concat!("handin/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            raw_url: settings.raw_url.clone(),
            api_url: settings.api_url.clone(),
            status_url: settings.status_url.clone(),
        }
    }

    fn raw_file_url(&self, org: &str, repo: &str, branch: &str, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.raw_url)
            .map_err(|e| Error::Parse(format!("invalid raw url {}: {e}", self.raw_url)))?;
        url.path_segments_mut()
            .map_err(|()| Error::Parse(format!("invalid raw url {}", self.raw_url)))?
            .pop_if_empty()
            .extend([org, repo, "raw"])
            .extend(branch.split('/'))
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

/// Map a transport-level failure onto the pipeline's error kinds
fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.url().map_or_else(String::new, ToString::to_string))
    } else if err.is_connect() {
        Error::ConnectionFailure(OFFLINE.to_string())
    } else {
        Error::Http(err)
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn fetch_file(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>> {
        let url = self.raw_file_url(org, repo, branch, path)?;
        tracing::debug!(%url, "fetching raw file");

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => {
                Ok(Some(response.text().await.map_err(transport_error)?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                tracing::debug!(%status, "unexpected status fetching raw file");
                self.check_status().await?;
                Err(Error::ConnectionFailure(OFFLINE.to_string()))
            }
        }
    }

    async fn current_user(&self, login: &str, token: &str) -> Result<String> {
        let url = format!("{}/user", self.api_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .basic_auth(login, Some(token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Auth("Invalid username and/or token.".to_string()))
            }
            _ => {
                let user: GitHubUser = response
                    .error_for_status()?
                    .json()
                    .await
                    .map_err(|e| Error::Parse(e.to_string()))?;
                Ok(user.login)
            }
        }
    }

    async fn check_status(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .map_err(|_| Error::ConnectionFailure(OFFLINE.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::ConnectionFailure(OFFLINE.to_string()));
        }

        let page: StatusPage = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;
        if let Some(component) = page.components.iter().find(|c| c.status != "operational") {
            return Err(Error::ConnectionFailure(format!(
                "Could not connect to GitHub. It looks like GitHub is having some issues with {}. \
                 Do check on https://www.githubstatus.com and try again later.",
                component.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn service(server: &Server) -> GitHubService {
        GitHubService::new(&Settings {
            raw_url: server.url(),
            api_url: server.url(),
            status_url: format!("{}/status.json", server.url()),
            ..Settings::default()
        })
    }

    fn status_body(name: &str, status: &str) -> String {
        json!({ "components": [{ "name": name, "status": status }] }).to_string()
    }

    #[test]
    fn test_raw_url_keeps_branch_slashes() {
        let svc = GitHubService::new(&Settings::default());
        let url = svc
            .raw_file_url("cs50", "problems", "2024/x", "hello/.cs50.yml")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.com/cs50/problems/raw/2024/x/hello/.cs50.yml"
        );
    }

    #[tokio::test]
    async fn test_fetch_file_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cs50/problems/raw/main/hello/.cs50.yml")
            .with_body("submit50: true\n")
            .create_async()
            .await;

        let body = service(&server)
            .fetch_file("cs50", "problems", "main", "hello/.cs50.yml")
            .await
            .unwrap();
        assert_eq!(body.as_deref(), Some("submit50: true\n"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_file_missing_is_none() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let body = service(&server)
            .fetch_file("cs50", "problems", "main", "hello/.cs50.yaml")
            .await
            .unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_server_error_reports_degraded_component() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/status.json")
            .with_body(status_body("API Requests", "major_outage"))
            .create_async()
            .await;
        server
            .mock("GET", Matcher::Regex("^/cs50/".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let err = service(&server)
            .fetch_file("cs50", "problems", "main", "hello/.cs50.yml")
            .await
            .unwrap_err();
        match err {
            Error::ConnectionFailure(msg) => assert!(msg.contains("API Requests")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_status_operational() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/status.json")
            .with_body(status_body("Git Operations", "operational"))
            .create_async()
            .await;
        assert!(service(&server).check_status().await.is_ok());
    }

    #[tokio::test]
    async fn test_current_user_returns_canonical_login() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/user")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .with_body(json!({ "login": "Octocat", "id": 1 }).to_string())
            .create_async()
            .await;

        let login = service(&server)
            .current_user("octocat", "ghp_token")
            .await
            .unwrap();
        assert_eq!(login, "Octocat");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_current_user_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/user")
            .with_status(401)
            .create_async()
            .await;

        let err = service(&server)
            .current_user("octocat", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
