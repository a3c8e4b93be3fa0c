use crate::domain::model::{DeliveryOutcome, DispatchRequest, DispatchResult, OutgoingMessage};
use crate::domain::ports::{MailTransport, SessionError, TransportSession};
use crate::utils::error::{EtlError, Result};
use std::ops::{Deref, DerefMut};

/// Closes the wrapped session when dropped, on every exit path.
struct SessionGuard<S: TransportSession> {
    session: S,
}

impl<S: TransportSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: TransportSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: TransportSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.close();
        tracing::debug!("Transport session closed");
    }
}

/// Sends one message per recipient over a single session, in recipient order.
///
/// Per-recipient failures are collected into the result. If the session
/// cannot be connected, encrypted or authenticated, the whole recipient set
/// is returned as failed inside [`EtlError::TransportError`].
pub fn dispatch_all<T: MailTransport + ?Sized>(
    transport: &T,
    request: &DispatchRequest,
) -> Result<DispatchResult> {
    let endpoint = &request.endpoint;
    tracing::info!(
        "Opening transport session to {} for {} recipients",
        endpoint,
        request.recipients.len()
    );

    let mut session = open_session(transport, request).map_err(|e| {
        tracing::error!("Transport session to {} failed: {}", endpoint, e);
        EtlError::TransportError {
            endpoint: endpoint.to_string(),
            stage: e.stage,
            reason: e.message,
            failed: request.recipients.to_vec(),
        }
    })?;

    let mut result = DispatchResult::default();
    for recipient in &request.recipients {
        let message = OutgoingMessage {
            from: request.sender.clone(),
            to: recipient.clone(),
            subject: request.subject.clone(),
            body: request.body.clone(),
        };

        result.attempted += 1;
        match submit(&mut *session, &message) {
            DeliveryOutcome::Submitted => {
                tracing::debug!("Submitted message to {}", recipient);
            }
            DeliveryOutcome::Rejected { reason } => {
                tracing::warn!("Failed to send to {}: {}", recipient, reason);
                result.failed.push(recipient.clone());
            }
        }
    }

    tracing::info!(
        "Dispatch finished: {} attempted, {} delivered, {} failed",
        result.attempted,
        result.delivered(),
        result.failed.len()
    );

    Ok(result)
}

fn open_session<T: MailTransport + ?Sized>(
    transport: &T,
    request: &DispatchRequest,
) -> std::result::Result<SessionGuard<T::Session>, SessionError> {
    let mut guard = SessionGuard {
        session: transport.connect(&request.endpoint)?,
    };
    guard.start_tls()?;
    guard.authenticate(&request.sender, &request.secret)?;
    tracing::debug!("Authenticated as {}", request.sender);
    Ok(guard)
}

fn submit<S: TransportSession>(session: &mut S, message: &OutgoingMessage) -> DeliveryOutcome {
    match session.submit(message) {
        Ok(()) => DeliveryOutcome::Submitted,
        Err(e) => DeliveryOutcome::Rejected { reason: e.message },
    }
}
