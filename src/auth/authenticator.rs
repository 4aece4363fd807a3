//! Applying credentials to outgoing requests

use super::types::{Credential, Location};
use reqwest::RequestBuilder;

impl Credential {
    /// Attach this credential to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Credential::None => req,

            Credential::Bearer { token } => req.bearer_auth(token),

            Credential::ApiKey {
                value,
                location,
                header_name,
                query_param,
                prefix,
            } => {
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => {
                        let header = header_name.as_deref().unwrap_or("Authorization");
                        req.header(header, val)
                    }
                    Location::Query => {
                        let param = query_param.as_deref().unwrap_or("api_key");
                        req.query(&[(param, val)])
                    }
                }
            }

            Credential::Basic { username, password } => {
                let password = (!password.is_empty()).then_some(password);
                req.basic_auth(username, password)
            }

            Credential::Headers { headers } => headers
                .iter()
                .fold(req, |req, (key, value)| req.header(key.as_str(), value.as_str())),
        }
    }
}
