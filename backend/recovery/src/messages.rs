use braindrive_core::{ErrorKind, PluginError};

/// Friendly text for an error, suitable for the error panel.
pub fn user_message(error: &PluginError) -> String {
    match error.kind {
        ErrorKind::Network => match error.as_network().and_then(|n| n.status) {
            Some(401) | Some(403) => {
                "You are not authorized to load this data. Please sign in again.".to_string()
            }
            Some(404) => "The requested data could not be found.".to_string(),
            _ => "Unable to reach the server. Please check your connection and try again."
                .to_string(),
        },
        ErrorKind::Validation => match error.as_validation() {
            Some(v) => format!("Invalid {}: {}", v.field, v.message),
            None => "Some of the values you entered are invalid.".to_string(),
        },
        ErrorKind::Service | ErrorKind::ServiceInit => {
            "A required service is temporarily unavailable. Please try again later.".to_string()
        }
        ErrorKind::Component | ErrorKind::Render => {
            "Something went wrong while displaying this plugin.".to_string()
        }
        ErrorKind::Permission => "You do not have permission to perform this action.".to_string(),
        ErrorKind::Timeout => {
            "The operation took too long to complete. Please try again.".to_string()
        }
        ErrorKind::Unknown => "An unexpected error occurred. Please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_field() {
        let err = PluginError::validation("customMessage", "too long");
        assert_eq!(user_message(&err), "Invalid customMessage: too long");
    }

    #[test]
    fn network_message_depends_on_status() {
        let missing = PluginError::network("/api/items", Some(404), "not found");
        assert!(user_message(&missing).contains("could not be found"));
        let down = PluginError::network("/api/items", None, "refused");
        assert!(user_message(&down).contains("check your connection"));
    }
}
