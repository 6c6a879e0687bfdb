//! Outbound bitrate policy
//!
//! Static per-kind ceilings applied to every outbound encoding. The policy is
//! idempotent: it runs once right after a connection is created and again for
//! every sender the connection reports later, so senders that appear after
//! negotiation settles are capped the same way.

use crate::config::BitrateCaps;
use crate::media::{EncodingParameters, MediaConnection, MediaSender, TrackKind};
use tracing::{debug, warn};

/// Cap every sender the connection currently knows about
pub fn apply_connection_caps(connection: &dyn MediaConnection, caps: &BitrateCaps) {
    for sender in connection.senders() {
        apply_sender_cap(sender.as_ref(), caps);
    }
}

/// Cap one sender's encodings to its kind's ceiling. Synthesizes a single
/// default encoding when the sender reports none. Best-effort: a rejected
/// update is logged, not propagated.
pub fn apply_sender_cap(sender: &dyn MediaSender, caps: &BitrateCaps) {
    let cap = match sender.kind() {
        TrackKind::Video => caps.video_bps,
        TrackKind::Audio => caps.audio_bps,
    };

    let mut parameters = sender.parameters();
    if parameters.encodings.is_empty() {
        parameters.encodings.push(EncodingParameters::default());
    }
    for encoding in &mut parameters.encodings {
        encoding.max_bitrate = Some(cap);
    }

    match sender.set_parameters(parameters) {
        Ok(()) => debug!("capped {} sender at {} bps", sender.kind(), cap),
        Err(e) => warn!("failed to cap {} sender: {}", sender.kind(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::SenderParameters;
    use crate::Result;
    use parking_lot::Mutex;

    struct TestSender {
        kind: TrackKind,
        parameters: Mutex<SenderParameters>,
    }

    impl TestSender {
        fn new(kind: TrackKind, parameters: SenderParameters) -> Self {
            Self {
                kind,
                parameters: Mutex::new(parameters),
            }
        }
    }

    impl MediaSender for TestSender {
        fn kind(&self) -> TrackKind {
            self.kind
        }

        fn parameters(&self) -> SenderParameters {
            self.parameters.lock().clone()
        }

        fn set_parameters(&self, parameters: SenderParameters) -> Result<()> {
            *self.parameters.lock() = parameters;
            Ok(())
        }
    }

    #[test]
    fn test_caps_by_kind() {
        let caps = BitrateCaps::default();
        let video = TestSender::new(
            TrackKind::Video,
            SenderParameters {
                encodings: vec![EncodingParameters::default()],
            },
        );
        let audio = TestSender::new(
            TrackKind::Audio,
            SenderParameters {
                encodings: vec![EncodingParameters::default()],
            },
        );

        apply_sender_cap(&video, &caps);
        apply_sender_cap(&audio, &caps);

        assert_eq!(video.parameters().encodings[0].max_bitrate, Some(250_000));
        assert_eq!(audio.parameters().encodings[0].max_bitrate, Some(128_000));
    }

    #[test]
    fn test_synthesizes_missing_encoding() {
        let caps = BitrateCaps::default();
        let sender = TestSender::new(TrackKind::Video, SenderParameters::default());

        apply_sender_cap(&sender, &caps);

        let parameters = sender.parameters();
        assert_eq!(parameters.encodings.len(), 1);
        assert_eq!(parameters.encodings[0].max_bitrate, Some(250_000));
    }

    #[test]
    fn test_caps_every_encoding() {
        let caps = BitrateCaps::default();
        let sender = TestSender::new(
            TrackKind::Video,
            SenderParameters {
                encodings: vec![EncodingParameters::default(); 3],
            },
        );

        apply_sender_cap(&sender, &caps);

        assert!(sender
            .parameters()
            .encodings
            .iter()
            .all(|e| e.max_bitrate == Some(250_000)));
    }

    #[test]
    fn test_reapply_is_idempotent() {
        let caps = BitrateCaps::default();
        let sender = TestSender::new(TrackKind::Audio, SenderParameters::default());

        apply_sender_cap(&sender, &caps);
        let first = sender.parameters();
        apply_sender_cap(&sender, &caps);

        assert_eq!(sender.parameters(), first);
    }
}
