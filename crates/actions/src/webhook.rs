//! Dialogflow v2 fulfillment envelope with the Actions on Google payload.
//!
//! Only the fields the transaction flow reads or writes are modelled; unknown
//! request fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    arguments::TurnArguments,
    dispatch::ConversationRequest,
    responses::{ConversationResponse, OrderUpdate, ResponseItem},
    session::{ConversationData, SessionId},
};

pub const CONVERSATION_CONTEXT: &str = "_actions_on_google";
const CONTEXT_LIFESPAN: u32 = 99;
const PLACEHOLDER_PROMPT: &str = "PLACEHOLDER";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub query_result: QueryResult,
    #[serde(default)]
    pub original_detect_intent_request: OriginalDetectIntentRequest,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub intent: Option<IntentRef>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub output_contexts: Vec<Context>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl Context {
    fn is_conversation_context(&self) -> bool {
        self.name.rsplit('/').next() == Some(CONVERSATION_CONTEXT)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OriginalDetectIntentRequest {
    #[serde(default)]
    pub payload: AssistantPayload,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AssistantPayload {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub conversation: Option<Conversation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub arguments: Vec<RawArgument>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawArgument {
    pub name: String,
    #[serde(default)]
    pub extension: Value,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WebhookDecodeError {
    #[error("request carries no session identifier")]
    MissingSession,
    #[error("request carries no intent name")]
    MissingIntent,
}

/// A decoded request plus any conversation data the platform echoed back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTurn {
    pub request: ConversationRequest,
    pub carried_data: Option<ConversationData>,
}

impl WebhookRequest {
    pub fn decode(self) -> Result<DecodedTurn, WebhookDecodeError> {
        let payload = self.original_detect_intent_request.payload;

        let session = non_empty(Some(self.session))
            .or_else(|| non_empty(payload.conversation.and_then(|c| c.conversation_id)))
            .ok_or(WebhookDecodeError::MissingSession)?;

        let intent_name = self
            .query_result
            .intent
            .map(|intent| intent.display_name)
            .and_then(|name| non_empty(Some(name)))
            .ok_or(WebhookDecodeError::MissingIntent)?;

        let locale_tag = non_empty(payload.user.and_then(|user| user.locale))
            .or_else(|| non_empty(self.query_result.language_code))
            .unwrap_or_default();

        let correlation_id = non_empty(Some(self.response_id))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let arguments = TurnArguments::decode(
            payload
                .inputs
                .iter()
                .flat_map(|input| input.arguments.iter())
                .map(|argument| (argument.name.as_str(), &argument.extension)),
        );

        let carried_data = self
            .query_result
            .output_contexts
            .iter()
            .find(|context| context.is_conversation_context())
            .and_then(|context| carried_data(context, &correlation_id));

        Ok(DecodedTurn {
            request: ConversationRequest {
                intent_name,
                locale_tag,
                session_id: SessionId(session),
                correlation_id,
                arguments,
            },
            carried_data,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn carried_data(context: &Context, correlation_id: &str) -> Option<ConversationData> {
    let decoded = match context.parameters.get("data")? {
        Value::String(raw) => serde_json::from_str(raw),
        other => ConversationData::deserialize(other),
    };

    decoded
        .map_err(|error| {
            tracing::warn!(
                event_name = "actions.context.undecodable",
                correlation_id,
                error = %error,
                "ignoring conversation data carried in output context"
            );
        })
        .ok()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub payload: ResponsePayload,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<Context>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponsePayload {
    pub google: GooglePayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePayload {
    pub expect_user_response: bool,
    pub rich_response: RichResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_intent: Option<SystemIntentPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RichResponse {
    pub items: Vec<RichItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RichItem {
    SimpleResponse(SimpleResponse),
    StructuredResponse(StructuredResponse),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    pub text_to_speech: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredResponse {
    pub order_update: Box<OrderUpdate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemIntentPayload {
    pub intent: String,
    pub data: Value,
}

impl WebhookResponse {
    /// Encodes a response. `data` is echoed in the conversation context when
    /// present; a closing response passes `None`.
    pub fn encode(
        response: &ConversationResponse,
        session: &SessionId,
        data: Option<&ConversationData>,
    ) -> Result<Self, serde_json::Error> {
        let mut items = response
            .items
            .iter()
            .map(|item| match item {
                ResponseItem::Prompt(text) => {
                    RichItem::SimpleResponse(SimpleResponse { text_to_speech: text.clone() })
                }
                ResponseItem::OrderUpdate(update) => {
                    let order_update = update.clone();
                    RichItem::StructuredResponse(StructuredResponse { order_update })
                }
            })
            .collect::<Vec<_>>();

        let system_intent = response
            .system_intent
            .as_ref()
            .map(|intent| {
                intent.data().map(|data| SystemIntentPayload {
                    intent: intent.intent_name().to_owned(),
                    data,
                })
            })
            .transpose()?;

        let has_prompt = items.iter().any(|item| matches!(item, RichItem::SimpleResponse(_)));
        if system_intent.is_some() && !has_prompt {
            items.insert(
                0,
                RichItem::SimpleResponse(SimpleResponse {
                    text_to_speech: PLACEHOLDER_PROMPT.to_owned(),
                }),
            );
        }

        let output_contexts = match data {
            Some(data) => vec![conversation_context(session, data)?],
            None => Vec::new(),
        };

        Ok(Self {
            payload: ResponsePayload {
                google: GooglePayload {
                    expect_user_response: response.expects_user_response(),
                    rich_response: RichResponse { items },
                    system_intent,
                },
            },
            output_contexts,
        })
    }
}

fn conversation_context(
    session: &SessionId,
    data: &ConversationData,
) -> Result<Context, serde_json::Error> {
    let mut parameters = Map::new();
    parameters.insert("data".to_owned(), Value::String(serde_json::to_string(data)?));
    Ok(Context {
        name: format!("{session}/contexts/{CONVERSATION_CONTEXT}"),
        lifespan_count: Some(CONTEXT_LIFESPAN),
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use bookcart_core::{Location, PostalAddress};
    use serde_json::json;

    use super::{WebhookDecodeError, WebhookRequest, WebhookResponse};
    use crate::arguments::RequirementsCheckOutcome;
    use crate::responses::{ResponseBuilder, TransactionRequirementsSpec};
    use crate::session::{ConversationData, SessionId};

    fn parse(value: serde_json::Value) -> WebhookRequest {
        serde_json::from_value(value).expect("request shape")
    }

    #[test]
    fn decodes_intent_locale_session_and_arguments() {
        let turn = parse(json!({
            "responseId": "resp-1",
            "session": "projects/p/agent/sessions/abc",
            "queryResult": {
                "intent": {"displayName": "transaction_check_complete"},
                "languageCode": "en"
            },
            "originalDetectIntentRequest": {
                "payload": {
                    "user": {"locale": "ja-JP"},
                    "inputs": [{
                        "intent": "actions.intent.TRANSACTION_REQUIREMENTS_CHECK",
                        "arguments": [{
                            "name": "TRANSACTION_REQUIREMENTS_CHECK_RESULT",
                            "extension": {"resultType": "OK"}
                        }]
                    }]
                }
            }
        }))
        .decode()
        .expect("decode");

        assert_eq!(turn.request.intent_name, "transaction_check_complete");
        assert_eq!(turn.request.locale_tag, "ja-JP");
        assert_eq!(turn.request.correlation_id, "resp-1");
        assert_eq!(turn.request.session_id, SessionId("projects/p/agent/sessions/abc".into()));
        assert_eq!(
            turn.request.arguments.requirements_check,
            Some(RequirementsCheckOutcome::Ok)
        );
        assert_eq!(turn.carried_data, None);
    }

    #[test]
    fn language_code_is_used_when_user_locale_missing() {
        let turn = parse(json!({
            "session": "projects/p/agent/sessions/abc",
            "queryResult": {"intent": {"displayName": "delivery_address"}, "languageCode": "ja"}
        }))
        .decode()
        .expect("decode");

        assert_eq!(turn.request.locale_tag, "ja");
        assert!(!turn.request.correlation_id.is_empty());
    }

    #[test]
    fn missing_intent_or_session_is_rejected() {
        let error = parse(json!({"session": "projects/p/agent/sessions/abc"}))
            .decode()
            .expect_err("no intent");
        assert_eq!(error, WebhookDecodeError::MissingIntent);

        let error = parse(json!({"queryResult": {"intent": {"displayName": "delivery_address"}}}))
            .decode()
            .expect_err("no session");
        assert_eq!(error, WebhookDecodeError::MissingSession);
    }

    #[test]
    fn carried_data_is_read_from_conversation_context() {
        let data = json!({"deliveryAddress": {"postalAddress": {"addressLines": ["5 Elm"]}}});
        let turn = parse(json!({
            "session": "projects/p/agent/sessions/abc",
            "queryResult": {
                "intent": {"displayName": "transaction_decision_action"},
                "outputContexts": [
                    {"name": "projects/p/agent/sessions/abc/contexts/other", "parameters": {}},
                    {
                        "name": "projects/p/agent/sessions/abc/contexts/_actions_on_google",
                        "lifespanCount": 99,
                        "parameters": {"data": data.to_string()}
                    }
                ]
            }
        }))
        .decode()
        .expect("decode");

        let data = turn.carried_data.expect("carried data");
        let address = data.delivery_address.expect("address");
        assert_eq!(address.postal_address.first_line(), Some("5 Elm"));
    }

    #[test]
    fn system_intent_without_prompt_gets_placeholder() {
        let response = ResponseBuilder::ask()
            .requirements_check(TransactionRequirementsSpec::default())
            .build();
        let session = SessionId("projects/p/agent/sessions/abc".into());
        let data = ConversationData::default();
        let encoded =
            WebhookResponse::encode(&response, &session, Some(&data)).expect("encode");

        let value = serde_json::to_value(&encoded).expect("serialize");
        assert_eq!(value["payload"]["google"]["expectUserResponse"], true);
        assert_eq!(
            value["payload"]["google"]["richResponse"]["items"],
            json!([{"simpleResponse": {"textToSpeech": "PLACEHOLDER"}}])
        );
        assert_eq!(
            value["payload"]["google"]["systemIntent"]["intent"],
            "actions.intent.TRANSACTION_REQUIREMENTS_CHECK"
        );
        assert_eq!(
            value["outputContexts"][0]["name"],
            "projects/p/agent/sessions/abc/contexts/_actions_on_google"
        );
        assert_eq!(value["outputContexts"][0]["parameters"]["data"], "{}");
    }

    #[test]
    fn closing_response_has_no_context_or_system_intent() {
        let response = ResponseBuilder::close().prompt("Transaction failed.").build();
        let session = SessionId("projects/p/agent/sessions/abc".into());
        let value = serde_json::to_value(
            WebhookResponse::encode(&response, &session, None).expect("encode"),
        )
        .expect("serialize");

        assert_eq!(
            value,
            json!({
                "payload": {
                    "google": {
                        "expectUserResponse": false,
                        "richResponse": {
                            "items": [{"simpleResponse": {"textToSpeech": "Transaction failed."}}]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn stored_address_round_trips_through_context() {
        let data = ConversationData {
            delivery_address: Some(Location {
                postal_address: PostalAddress {
                    address_lines: vec!["7 Oak Lane".into()],
                    ..PostalAddress::default()
                },
                ..Location::default()
            }),
        };
        let session = SessionId("projects/p/agent/sessions/abc".into());
        let response = ResponseBuilder::ask().prompt("ok").build();
        let encoded = WebhookResponse::encode(&response, &session, Some(&data)).expect("encode");
        let context = serde_json::to_value(&encoded.output_contexts[0]).expect("context");

        let turn = parse(json!({
            "session": "projects/p/agent/sessions/abc",
            "queryResult": {
                "intent": {"displayName": "transaction_decision_action"},
                "outputContexts": [context]
            }
        }))
        .decode()
        .expect("decode");
        assert_eq!(turn.carried_data, Some(data));
    }
}
