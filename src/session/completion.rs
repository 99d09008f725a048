#[cfg(test)]
#[path = "completion_test.rs"]
mod tests;

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::backend::{ArcBackend, FragmentStream, strip_reasoning};
use crate::config::constants::TITLE_SYSTEM_PROMPT;
use crate::models::{
    ArcEventTx, BackendError, Event, GenerateOptions, GenerateRequest, Message, Settings,
    SettingsUpdate,
};

use super::session::Session;
use super::store::SharedStore;

/// How a call to [`Session::submit`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Blank prompt or no model; nothing was touched.
    Ignored,
    /// Another reply is still streaming; nothing was touched.
    Busy,
    Done,
    /// Stopped by [`Session::abort`] or because the conversation went away.
    Aborted,
    Failed,
}

impl Session {
    /// Send `prompt` to `model` within the current conversation (creating one
    /// when none is current) and stream the reply into it.
    pub async fn submit(&self, prompt: &str, model: &str) -> CompletionOutcome {
        self.run_completion(prompt.to_string(), model, false).await
    }

    /// Like [`Session::submit`] with the pending input, which is cleared once
    /// the submission is accepted.
    pub async fn submit_input(&self, model: &str) -> CompletionOutcome {
        let prompt = self.input();
        self.run_completion(prompt, model, true).await
    }

    /// Stop the reply that is streaming, if any. Text received so far stays.
    pub fn abort(&self) -> bool {
        match self.state.lock().cancel.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Wait for title requests still in flight.
    pub async fn wait_background(&self) {
        // Take the set so new title tasks can be spawned while this drains.
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        while let Some(res) = tasks.join_next().await {
            if let Err(err) = res {
                log::error!("Background task error: {}", err);
            }
        }
    }

    async fn run_completion(&self, prompt: String, model: &str, from_input: bool) -> CompletionOutcome {
        if prompt.trim().is_empty() || model.trim().is_empty() {
            log::debug!("Ignoring submission without prompt or model");
            return CompletionOutcome::Ignored;
        }

        let (cancel, session_settings) = {
            let mut state = self.state.lock();
            if state.loading {
                log::warn!("A reply is still streaming, ignoring submission");
                return CompletionOutcome::Busy;
            }
            let token = CancellationToken::new();
            state.loading = true;
            state.cancel = Some(token.clone());
            if from_input {
                state.input.clear();
            }
            (token, state.settings.clone())
        };

        let user = Message::new_user(prompt.as_str());
        let placeholder = Message::new_assistant(model);

        let opened = {
            let mut store = self.store.lock();
            let id = match store.current_id() {
                Some(id) => id.to_string(),
                None => {
                    let id = store.create();
                    if let Err(err) = store.update_settings(SettingsUpdate::from(&session_settings)) {
                        log::warn!("Failed to apply session settings: {}", err);
                    }
                    id
                }
            };

            let first_exchange = store.get(&id).map(|c| c.is_empty()).unwrap_or(false);
            let settings = store.get(&id).map(|c| c.settings()).unwrap_or_default();
            store
                .append_message_to(&id, user)
                .and_then(|_| store.append_message_to(&id, placeholder))
                .map(|_| (id, first_exchange, settings))
        };

        let (conversation_id, first_exchange, settings) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                log::error!("Failed to open the exchange: {}", err);
                self.finish_loading().await;
                return CompletionOutcome::Failed;
            }
        };

        if first_exchange && self.title.enabled {
            let request = title_request(&prompt, model, &settings.system, &self.title.keep_alive);
            self.spawn_title(conversation_id.clone(), request).await;
        }

        self.emit(Event::LoadingChanged(true)).await;

        let request = reply_request(&prompt, model, &settings);
        self.stream_reply(&conversation_id, request, cancel).await
    }

    async fn stream_reply(
        &self,
        conversation_id: &str,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> CompletionOutcome {
        let started = tokio::select! {
            _ = cancel.cancelled() => return self.stop(conversation_id, "aborted").await,
            res = self.backend.generate_stream(request) => res,
        };

        let mut stream: FragmentStream = match started {
            Ok(stream) => stream,
            Err(err) => return self.fail(conversation_id, format!("{err:#}")).await,
        };

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return self.stop(conversation_id, "aborted").await,
                item = stream.next() => item,
            };

            let fragment = match item {
                Some(Ok(fragment)) => fragment,
                Some(Err(BackendError::MalformedChunk(chunk))) => {
                    log::warn!("Skipping malformed chunk: {}", chunk);
                    continue;
                }
                Some(Err(err)) => return self.fail(conversation_id, err.to_string()).await,
                None => {
                    return self
                        .fail(conversation_id, "stream ended before completion".to_string())
                        .await;
                }
            };

            if !fragment.response.is_empty() {
                let appended = self
                    .store
                    .lock()
                    .append_to_last_assistant_message_in(conversation_id, &fragment.response);
                match appended {
                    Ok(true) => {
                        self.emit(Event::Fragment {
                            conversation_id: conversation_id.to_string(),
                            text: fragment.response,
                        })
                        .await;
                    }
                    Ok(false) => {
                        log::warn!("Last message of {} is not a reply, dropping fragment", conversation_id);
                    }
                    Err(err) => return self.stop(conversation_id, &err.to_string()).await,
                }
            }

            if fragment.done {
                log::debug!("Reply for {} completed", conversation_id);
                self.finish_loading().await;
                return CompletionOutcome::Done;
            }
        }
    }

    async fn spawn_title(&self, conversation_id: String, request: GenerateRequest) {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let event_tx = self.event_tx.clone();

        let mut tasks = self.tasks.lock().await;
        while let Some(res) = tasks.try_join_next() {
            if let Err(err) = res {
                log::error!("Background task error: {}", err);
            }
        }
        tasks.spawn(generate_title(backend, store, event_tx, conversation_id, request));
    }

    async fn finish_loading(&self) {
        {
            let mut state = self.state.lock();
            state.loading = false;
            state.cancel = None;
        }
        self.emit(Event::LoadingChanged(false)).await;
    }

    /// Dropping the stream closes the underlying request.
    async fn stop(&self, conversation_id: &str, reason: &str) -> CompletionOutcome {
        log::info!("Reply for {} stopped: {}", conversation_id, reason);
        self.finish_loading().await;
        CompletionOutcome::Aborted
    }

    async fn fail(&self, conversation_id: &str, reason: String) -> CompletionOutcome {
        log::error!("Reply for {} failed: {}", conversation_id, reason);
        self.finish_loading().await;
        self.emit(Event::CompletionFailed {
            conversation_id: conversation_id.to_string(),
            reason,
        })
        .await;
        CompletionOutcome::Failed
    }
}

async fn generate_title(
    backend: ArcBackend,
    store: SharedStore,
    event_tx: Option<ArcEventTx>,
    conversation_id: String,
    request: GenerateRequest,
) {
    let res = match backend.generate(request).await {
        Ok(res) => res,
        Err(err) => {
            log::error!("Failed to generate title for {}: {:?}", conversation_id, err);
            return;
        }
    };

    let title = strip_reasoning(&res.response);
    if title.is_empty() {
        log::warn!("Title response for {} is empty", conversation_id);
        return;
    }

    let renamed = store.lock().rename(&conversation_id, &title);
    if let Err(err) = renamed {
        log::warn!("Failed to apply title: {}", err);
        return;
    }
    log::debug!("Conversation {} titled {:?}", conversation_id, title);

    if let Some(event_tx) = event_tx {
        let event = Event::ConversationRenamed {
            id: conversation_id,
            title,
        };
        event_tx.send(event).await.unwrap_or_else(|err| {
            log::debug!("Dropping session event: {}", err);
        });
    }
}

pub(crate) fn reply_request(prompt: &str, model: &str, settings: &Settings) -> GenerateRequest {
    let seed = match settings.seed.trim() {
        "" => None,
        raw => match raw.parse::<i64>() {
            Ok(seed) => Some(seed),
            Err(err) => {
                log::warn!("Ignoring seed {:?}: {}", raw, err);
                None
            }
        },
    };

    GenerateRequest::new(model, prompt)
        .with_system(settings.system.as_str())
        .with_stream(true)
        .with_options(GenerateOptions {
            temperature: Some(settings.temperature),
            seed,
        })
}

/// The title is derived from the conversation's system prompt when there is
/// one, from the first prompt otherwise.
pub(crate) fn title_request(
    prompt: &str,
    model: &str,
    system: &str,
    keep_alive: &str,
) -> GenerateRequest {
    let subject = if system.trim().is_empty() {
        prompt
    } else {
        system
    };

    GenerateRequest::new(model, subject)
        .with_system(TITLE_SYSTEM_PROMPT)
        .with_stream(false)
        .with_keep_alive(keep_alive)
}
