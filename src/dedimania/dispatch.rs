use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::dedimania::{codec, CallError};
use crate::network::{PostOptions, Transport};
use crate::server::{Call, Value};

/// The kinds of requests posted to the ranking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    OpenSession { attempt: u32 },
    CheckSession,
    GetChallengeRecords,
    PlayerConnect,
    PlayerDisconnect,
    UpdateServerPlayers,
    SetChallengeTimes,
}

/// The context of a request at the time it was posted, used to decide
/// whether its completion is still relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub kind: RequestKind,

    /// The session the request was sent with.
    pub session_id: Option<String>,

    /// The map that was being played.
    pub map_uid: Option<String>,
}

/// The outcome of a request.
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Result<Value, CallError>,
}

/// Posts requests in the background, and sends their completions
/// to a channel, in the order they complete.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    options: PostOptions,
    completions: UnboundedSender<Completion>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        options: PostOptions,
    ) -> (Dispatcher, UnboundedReceiver<Completion>) {
        let (completions, completions_in) = unbounded_channel();
        let dispatcher = Dispatcher {
            transport,
            options,
            completions,
        };
        (dispatcher, completions_in)
    }

    /// Post a call without waiting for its completion.
    pub fn post(&self, ticket: Ticket, call: &Call) {
        log::debug!("post {}", call.name);
        let body = codec::encode(call);
        let transport = self.transport.clone();
        let options = self.options;
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let outcome = codec::reply(transport.post(body, options).await);
            if let Err(err) = &outcome {
                log::debug!("{:?} failed: {}", ticket.kind, err);
            }
            // The receiver is only dropped at shutdown.
            let _ = completions.send(Completion { ticket, outcome });
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::network::TransportError;
    use crate::server::xml::write_method_response;

    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        async fn post(
            &self,
            _body: Vec<u8>,
            options: PostOptions,
        ) -> Result<Vec<u8>, TransportError> {
            if options.compress {
                return Err(TransportError::Timeout);
            }
            let reply = Value::Array(vec![Value::Array(vec![Value::from(true)])]);
            Ok(write_method_response(&Ok(reply)))
        }
    }

    fn options(compress: bool) -> PostOptions {
        PostOptions {
            timeout: Duration::from_secs(1),
            compress,
        }
    }

    fn ticket() -> Ticket {
        Ticket {
            kind: RequestKind::CheckSession,
            session_id: Some("sid".to_string()),
            map_uid: None,
        }
    }

    #[tokio::test]
    async fn completion_carries_ticket() {
        let (dispatcher, mut completions) = Dispatcher::new(Arc::new(Echo), options(false));
        dispatcher.post(ticket(), &Call::new("dedimania.CheckSession", vec![]));

        let completion = completions.recv().await.unwrap();
        assert_eq!(ticket(), completion.ticket);
        assert_eq!(Value::from(true), completion.outcome.unwrap());
    }

    #[tokio::test]
    async fn transport_error_completes() {
        let (dispatcher, mut completions) = Dispatcher::new(Arc::new(Echo), options(true));
        dispatcher.post(ticket(), &Call::new("dedimania.CheckSession", vec![]));

        let completion = completions.recv().await.unwrap();
        assert!(matches!(
            completion.outcome,
            Err(CallError::Transport(TransportError::Timeout))
        ));
    }
}
