//! # IAM Policy Documents
//!
//! Translates the statement entries from a request's provider payload into
//! the inline policy document attached to the minted user.

use serde::Serialize;

use crate::crd::{CodecError, StatementEntry};

/// IAM policy document in the cloud's wire form
#[derive(Debug, Serialize)]
struct PolicyDocument<'a> {
    #[serde(rename = "Version")]
    version: &'static str,
    #[serde(rename = "Statement")]
    statement: Vec<PolicyStatement<'a>>,
}

#[derive(Debug, Serialize)]
struct PolicyStatement<'a> {
    #[serde(rename = "Effect")]
    effect: &'a str,
    #[serde(rename = "Action")]
    action: &'a [String],
    #[serde(rename = "Resource")]
    resource: &'a str,
}

/// Name of the inline policy for a user, deterministic from the user name
pub fn policy_name(user_name: &str) -> String {
    format!("{user_name}-policy")
}

/// Render the statement entries into a policy document string
pub fn policy_document(entries: &[StatementEntry]) -> Result<String, CodecError> {
    let document = PolicyDocument {
        version: "2012-10-17",
        statement: entries
            .iter()
            .map(|entry| PolicyStatement {
                effect: &entry.effect,
                action: &entry.action,
                resource: &entry.resource,
            })
            .collect(),
    };
    Ok(serde_json::to_string(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_name_is_deterministic() {
        assert_eq!(policy_name("mycluster-test-aws-user"), "mycluster-test-aws-user-policy");
    }

    #[test]
    fn test_policy_document_rendering() {
        let entries = vec![StatementEntry {
            effect: "Allow".to_string(),
            action: vec!["s3:CreateBucket".to_string(), "s3:DeleteBucket".to_string()],
            resource: "*".to_string(),
        }];

        let document = policy_document(&entries).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&document).unwrap();

        assert_eq!(parsed["Version"], "2012-10-17");
        assert_eq!(parsed["Statement"][0]["Effect"], "Allow");
        assert_eq!(parsed["Statement"][0]["Action"][0], "s3:CreateBucket");
        assert_eq!(parsed["Statement"][0]["Resource"], "*");
    }

    #[test]
    fn test_policy_document_empty_statements() {
        let document = policy_document(&[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(parsed["Statement"].as_array().unwrap().len(), 0);
    }
}
