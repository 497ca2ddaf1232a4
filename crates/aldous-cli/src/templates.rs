//! Starter documents for each collection.

use aldous_core::Collection;
use serde_json::{json, Value};

/// A filled-in example document for `collection` that passes validation.
pub fn template(collection: Collection) -> Value {
    match collection {
        Collection::Users => json!({
            "username": "enter_username_here",
            "password": "$2b$10$your_hashed_password_here",
            "userClass": "client",
            "profilePic": "optional_s3_url_here"
        }),
        Collection::Agents => json!({
            "name": "Agent Name",
            "aiModel": "claude-3-5-sonnet-20241022",
            "prompt": "You are a helpful assistant...",
            "phone": "+1234567890",
            "socialID": "optional_social_id",
            "activeStatus": true,
            "icon": "optional_s3_icon_url"
        }),
        Collection::Profiles => json!({
            "name": "John Doe",
            "country": "United States",
            "phone": "+1234567890",
            "profilePic": "optional_s3_url",
            "socialIDs": ["twitter_handle", "instagram_handle"]
        }),
        Collection::ChatSessions => json!({
            "subjectID": "profile_object_id_here",
            "assignedAgentID": "agent_object_id_here",
            "agentPlatform": "whatsapp",
            "agentPlatformID": "whatsapp_bot_id",
            "language": "English",
            "sessionDate": "2025-05-29T10:30:00.000Z",
            "metadata": {
                "location": "City, State",
                "device": "mobile",
                "confidence": 0.95
            },
            "messages": [
                {
                    "timestamp": "2025-05-29T10:30:00.000Z",
                    "role": "user",
                    "contentType": "text",
                    "content": "Hello, I need help..."
                }
            ]
        }),
        Collection::Analyses => json!({
            "subjectID": "profile_object_id_here",
            "executiveSummary": {
                "summary": "Two or three sentences on the subject.",
                "riskLevel": "LOW"
            },
            "riskFactors": ["first factor", "second factor"]
        }),
    }
}

/// Two copies of the template as a JSON array, for `bulk` files.
pub fn bulk_template(collection: Collection) -> Value {
    let one = template(collection);
    Value::Array(vec![one.clone(), one])
}

#[cfg(test)]
mod tests {
    use super::*;
    use aldous_core::schema;

    #[test]
    fn every_template_validates() {
        for collection in Collection::ALL {
            let value = template(collection);
            let document = value.as_object().unwrap();
            assert!(
                schema::validate(collection, document).is_ok(),
                "{collection} template should validate"
            );
        }
    }

    #[test]
    fn bulk_template_has_two_documents() {
        let bulk = bulk_template(Collection::Users);
        assert_eq!(bulk.as_array().map(Vec::len), Some(2));
    }
}
