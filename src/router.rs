use crate::badge::{BadgeController, ProcessingState};
use crate::cache::PolicyCache;
use crate::domain::domain_from_url;
use crate::error::{ProtocolError, RouterError};
use crate::messages::{AckStatus, ContentFetched, Message, Response, TabInfo};
use crate::results::PolicyRecord;
use crate::utils::now_millis;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// A message in flight to the router
pub struct Envelope {
    pub payload: Value,
    pub sender: Option<TabInfo>,
    pub reply: oneshot::Sender<Response>,
}

/// Cloneable sending side of the router
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Envelope>,
}

impl RouterHandle {
    /// Send a typed message and wait for the reply
    pub async fn send(&self, message: &Message, sender: Option<TabInfo>) -> Result<Response, RouterError> {
        self.send_value(message.to_value(), sender).await
    }

    /// Send a raw wire message and wait for the reply
    pub async fn send_value(&self, payload: Value, sender: Option<TabInfo>) -> Result<Response, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                payload,
                sender,
                reply,
            })
            .await
            .map_err(|_| RouterError::Closed)?;
        rx.await.map_err(|_| RouterError::NoReply)
    }
}

/// Background message handler. Badge-only messages are answered once the
/// badge is set; storage messages are answered from their own task after
/// the storage call finishes.
pub struct MessageRouter {
    cache: PolicyCache,
    badges: BadgeController,
}

impl MessageRouter {
    pub fn new(cache: PolicyCache, badges: BadgeController) -> Self {
        Self { cache, badges }
    }

    /// Start the router task. It runs until every handle is dropped.
    pub fn spawn(self) -> (RouterHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(256);
        let task = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                self.dispatch(envelope).await;
            }
            ::log::debug!("Message router stopped");
        });
        (RouterHandle { tx }, task)
    }

    async fn dispatch(&self, envelope: Envelope) {
        let Envelope {
            payload,
            sender,
            reply,
        } = envelope;

        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                ::log::warn!("Rejecting message: {:?}", e);
                respond(reply, Response::error(&e));
                return;
            }
        };
        ::log::debug!("Router received {}", message.kind());

        let tab = match (&sender, message.is_tab_scoped()) {
            (Some(tab), _) => Some(tab.clone()),
            (None, false) => None,
            (None, true) => {
                ::log::warn!("{} arrived without a sender tab", message.kind());
                respond(reply, Response::error(&ProtocolError::MissingSender));
                return;
            }
        };

        match (message, tab) {
            (Message::NoPrivacyLink { .. }, Some(tab)) => {
                self.badges.apply(tab.id, &tab.url, ProcessingState::NoPolicyFound).await;
                respond(reply, Response::received());
            }
            (Message::PrivacyLinksFound { data }, Some(tab)) => {
                if let Some(best) = data.links.first() {
                    ::log::info!("Tab {} found privacy policy: {}", tab.id, best.href);
                }
                self.badges.apply(tab.id, &tab.url, ProcessingState::Processing).await;
                respond(reply, Response::received());
            }
            (Message::PrivacyContentFetched { data }, Some(tab)) => {
                let cache = self.cache.clone();
                let badges = self.badges.clone();
                tokio::spawn(async move {
                    let response = store_content(&cache, &badges, &tab, data).await;
                    respond(reply, response);
                });
            }
            (Message::GetPrivacyPolicy { domain }, _) => {
                let domain = domain.unwrap_or_default();
                if domain.is_empty() {
                    respond(reply, Response::Policy(None));
                    return;
                }
                let cache = self.cache.clone();
                tokio::spawn(async move {
                    let record = cache.get(&domain).await;
                    ::log::debug!("Cached policy for {}: {}", domain, record.is_some());
                    respond(reply, Response::Policy(record));
                });
            }
            // Tab-scoped kinds always have a tab by now
            (_, None) => respond(reply, Response::error(&ProtocolError::MissingSender)),
        }
    }
}

async fn store_content(
    cache: &PolicyCache,
    badges: &BadgeController,
    tab: &TabInfo,
    data: ContentFetched,
) -> Response {
    let domain = domain_from_url(&tab.url);
    if domain.is_empty() {
        ::log::warn!("Tab {} has no usable domain: {:?}", tab.id, tab.url);
        return Response::error(&ProtocolError::InvalidDomain);
    }

    let record = PolicyRecord::new(data.url, data.content, data.analysis, now_millis());
    if let Err(e) = cache.upsert(&domain, &record).await {
        ::log::error!("Error storing privacy content for {}: {}", domain, e);
        return Response::error(&ProtocolError::StoreFailed);
    }

    badges.apply(tab.id, &tab.url, ProcessingState::ContentReady).await;
    Response::Ack {
        status: AckStatus::ContentStored,
    }
}

fn respond(reply: oneshot::Sender<Response>, response: Response) {
    if reply.send(response).is_err() {
        ::log::debug!("Sender stopped waiting for its reply");
    }
}
