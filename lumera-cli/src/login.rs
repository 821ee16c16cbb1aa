use anyhow::Context;
use clap::Args;
use thiserror::Error;

use lumera_core::{ApiError, ClientError, LoginMethod, LumeraClient};

const DEFAULT_HOST: &str = "api.lumera.photos";
const PASSWORD_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
#[error("login failed after {attempts} password attempts")]
pub struct LoginError {
    pub attempts: u32,
    #[source]
    pub source: ClientError,
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// Account name; falls back to LUMERA_USER
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Password; falls back to LUMERA_PASSWORD, else prompts on the terminal
    #[arg(long)]
    pub password: Option<String>,

    /// Service host; falls back to LUMERA_HOST
    #[arg(long)]
    pub host: Option<String>,

    /// Use plain http instead of https
    #[arg(long)]
    pub no_ssl: bool,

    /// Send the password in one call instead of answering a challenge
    #[arg(long)]
    pub plain_auth: bool,
}

impl ConnectArgs {
    fn username(&self) -> anyhow::Result<String> {
        if let Some(user) = &self.user {
            return Ok(user.clone());
        }
        std::env::var("LUMERA_USER").context("no account name; pass --user or set LUMERA_USER")
    }

    fn base_url(&self) -> String {
        let host = self
            .host
            .clone()
            .or_else(|| std::env::var("LUMERA_HOST").ok())
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let scheme = if self.no_ssl { "http" } else { "https" };
        format!("{scheme}://{host}")
    }

    fn login_method(&self) -> LoginMethod {
        if self.plain_auth { LoginMethod::Plain } else { LoginMethod::ChallengeResponse }
    }

    fn explicit_password(&self) -> Option<String> {
        self.password
            .clone()
            .or_else(|| std::env::var("LUMERA_PASSWORD").ok())
    }
}

pub struct Connection {
    pub client: LumeraClient,
    pub password: String,
    pub method: LoginMethod,
}

/// Builds a client from the connection flags and logs it in. Without an
/// explicit password this prompts on the terminal, allowing a few tries
/// before giving up.
pub async fn connect(args: &ConnectArgs) -> anyhow::Result<Connection> {
    let username = args.username()?;
    let method = args.login_method();
    let mut client = LumeraClient::with_base_url(&args.base_url(), username.clone())?;

    if let Some(password) = args.explicit_password() {
        client.login(&password, method).await?;
        return Ok(Connection { client, password, method });
    }

    for attempt in 1..=PASSWORD_ATTEMPTS {
        let password = rpassword::prompt_password(format!("{username}'s password: "))?;
        match client.login(&password, method).await {
            Ok(()) => return Ok(Connection { client, password, method }),
            Err(err) if is_credential_rejection(&err) => {
                if attempt < PASSWORD_ATTEMPTS {
                    eprintln!("Login rejected, try again.");
                    continue;
                }
                return Err(LoginError { attempts: PASSWORD_ATTEMPTS, source: err }.into());
            }
            Err(err) => return Err(err.into()),
        }
    }
    anyhow::bail!("giving up after {PASSWORD_ATTEMPTS} password attempts")
}

// Transport and protocol failures are not worth a second prompt; only an
// answer the service actively rejected is.
fn is_credential_rejection(err: &ClientError) -> bool {
    matches!(err, ClientError::Api(ApiError::Service { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(host: Option<&str>, no_ssl: bool, plain_auth: bool) -> ConnectArgs {
        ConnectArgs {
            user: Some("ansel".to_owned()),
            password: None,
            host: host.map(str::to_owned),
            no_ssl,
            plain_auth,
        }
    }

    #[test]
    fn base_url_honors_host_and_scheme_flags() {
        assert_eq!(args(Some("localhost:8080"), true, false).base_url(), "http://localhost:8080");
        assert_eq!(args(Some("photos.example"), false, false).base_url(), "https://photos.example");
    }

    #[test]
    fn challenge_response_is_the_default_method() {
        assert_eq!(args(None, false, false).login_method(), LoginMethod::ChallengeResponse);
        assert_eq!(args(None, false, true).login_method(), LoginMethod::Plain);
    }

    #[test]
    fn login_error_reports_the_attempt_count() {
        let err = LoginError {
            attempts: 3,
            source: ClientError::Api(ApiError::MissingResult),
        };
        assert_eq!(err.to_string(), "login failed after 3 password attempts");
    }

    #[test]
    fn service_rejections_allow_another_prompt() {
        let rejected = ClientError::Api(ApiError::Service {
            code: Some(401),
            message: "bad password".to_owned(),
        });
        assert!(is_credential_rejection(&rejected));

        let missing = ClientError::GroupNotFound { path: "/Home".to_owned() };
        assert!(!is_credential_rejection(&missing));
    }
}
