//! Protocol 1.7: keyboard-language synchronization.
//!
//! # Exchange
//!
//! ```text
//! server                                  client
//!   |  ── LSYN "enfr" ──────────────────▶   |   on client connected
//!   |  ◀────────────────── LSYN "enfrde" ─  |   client's catalogue
//!   |     (reconcile; notify about "de")    |
//!   |  ── LSET "en", CINN ... ──────────▶   |   every screen enter
//!   |  ◀──────────────────────── LSET "fr"  |   client switched layout
//! ```
//!
//! Languages the client has but the server lacks are reported to the user once
//! per received list.  A client asking for a layout the server does not have
//! installed only produces a warning; the session keeps running.

use std::sync::Arc;

use langsync_core::protocol::messages::{LanguageList, LanguageSet, WireMessage};
use langsync_core::{FieldReader, LayoutCatalogue, LayoutCode, MessageCode, ProtocolVersion};
use tracing::{debug, info, warn};

use super::chain::{ChainDeps, ChainError, EnterScreen, ProtocolHandler, SessionContext};
use super::lifecycle::ConnectedHook;
use super::platform::{KeyboardHandle, Notify};

/// Title of the notification raised for missing languages.
pub const MISSING_LANGUAGES_TITLE: &str = "Language synchronization error";

/// Builds the notification body naming every missing code.
pub fn missing_languages_message(missing: &LayoutCatalogue) -> String {
    format!("These languages are required for the server to work properly: {missing}")
}

pub struct LanguageSync {
    fallback: Box<dyn ProtocolHandler>,
    keyboard: KeyboardHandle,
    notifier: Arc<dyn Notify>,
    _connected: ConnectedHook,
}

impl LanguageSync {
    /// Wraps `fallback` and registers the session's "client connected" trigger.
    ///
    /// The trigger stays registered until this node is dropped.
    pub fn new(fallback: Box<dyn ProtocolHandler>, deps: &ChainDeps) -> Self {
        let connected = ConnectedHook::register(
            Arc::clone(&deps.events),
            deps.session_id,
            Arc::clone(&deps.on_connected),
        );
        Self {
            fallback,
            keyboard: deps.keyboard.clone(),
            notifier: Arc::clone(&deps.notifier),
            _connected: connected,
        }
    }

    fn send_language_list(&self, ctx: &mut SessionContext) {
        let local = self.keyboard.installed_layouts();
        debug!(client = %ctx.name, layouts = %local, "sending local keyboard layouts");
        ctx.outbox.push(&LanguageList::from_catalogue(&local));
    }

    fn language_list_received(
        &self,
        body: &mut FieldReader<'_>,
        ctx: &mut SessionContext,
    ) -> Result<(), ChainError> {
        let message =
            LanguageList::read_fields(body).map_err(ChainError::decode(MessageCode::LANGUAGE_LIST))?;
        let remote = message.catalogue();
        let local = self.keyboard.installed_layouts();
        let result = local.reconcile(&remote);

        if !result.supported.is_empty() {
            debug!(client = %ctx.name, supported = %result.supported, "client keyboard layouts supported by server");
        }
        if !result.is_complete() {
            warn!(client = %ctx.name, missing = %result.missing, "client keyboard layouts missing on server");
            self.notifier.notify(
                MISSING_LANGUAGES_TITLE,
                &missing_languages_message(&result.missing),
            );
        }
        Ok(())
    }

    fn language_set_received(
        &self,
        body: &mut FieldReader<'_>,
        ctx: &SessionContext,
    ) -> Result<(), ChainError> {
        let message =
            LanguageSet::read_fields(body).map_err(ChainError::decode(MessageCode::LANGUAGE_SET))?;
        let code = match LayoutCode::try_from(message.language.as_str()) {
            Ok(code) => code,
            Err(e) => {
                warn!(client = %ctx.name, error = %e, "ignoring language change request");
                return Ok(());
            }
        };

        if self.keyboard.set_active_layout(code) {
            info!(client = %ctx.name, language = %code, "keyboard layout changed");
        } else {
            warn!(
                client = %ctx.name,
                language = %code,
                "failed to change keyboard layout: language is not installed"
            );
        }
        Ok(())
    }
}

impl ProtocolHandler for LanguageSync {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1_7
    }

    fn fallback(&mut self) -> Option<&mut dyn ProtocolHandler> {
        Some(self.fallback.as_mut())
    }

    fn parse_message(
        &mut self,
        code: MessageCode,
        body: &mut FieldReader<'_>,
        ctx: &mut SessionContext,
    ) -> Result<bool, ChainError> {
        match code {
            MessageCode::LANGUAGE_LIST => self.language_list_received(body, ctx)?,
            MessageCode::LANGUAGE_SET => self.language_set_received(body, ctx)?,
            _ => return self.fallback.parse_message(code, body, ctx),
        }
        Ok(true)
    }

    fn enter(&mut self, enter: &EnterScreen, ctx: &mut SessionContext) {
        let language = self.keyboard.active_layout();
        debug!(client = %ctx.name, %language, "sending active language");
        ctx.outbox.push(&LanguageSet::new(language));
        self.fallback.enter(enter, ctx);
    }

    fn client_connected(&mut self, ctx: &mut SessionContext) {
        self.send_language_list(ctx);
        self.fallback.client_connected(ctx);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::{
        EventKind, LifecycleEvents, MockLifecycleEvents, SessionId, TriggerCallback,
    };
    use crate::application::platform::{KeyboardLayoutService, MockKeyboardLayoutService};
    use crate::application::protocol_v1_0::ProtocolV1_0;
    use langsync_core::FrameBuilder;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotify(Mutex<Vec<(String, String)>>);

    impl RecordingNotify {
        fn taken(&self) -> Vec<(String, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Notify for RecordingNotify {
        fn notify(&self, title: &str, body: &str) {
            self.0
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    fn permissive_events() -> Arc<dyn LifecycleEvents> {
        let mut events = MockLifecycleEvents::new();
        events.expect_register_trigger().return_const(());
        events.expect_unregister_trigger().return_const(true);
        Arc::new(events)
    }

    fn keyboard(installed: &'static str, active: &'static str) -> MockKeyboardLayoutService {
        let mut service = MockKeyboardLayoutService::new();
        service
            .expect_installed_layouts()
            .returning(move || LayoutCatalogue::decode(installed));
        service
            .expect_active_layout()
            .returning(move || LayoutCode::try_from(active).unwrap());
        service
    }

    fn node_with(
        service: impl KeyboardLayoutService + 'static,
        notifier: Arc<RecordingNotify>,
    ) -> LanguageSync {
        let deps = ChainDeps {
            session_id: SessionId::new_v4(),
            events: permissive_events(),
            on_connected: Arc::new(|| {}),
            keyboard: KeyboardHandle::new(service),
            notifier,
        };
        LanguageSync::new(Box::new(ProtocolV1_0::new()), &deps)
    }

    fn deliver(node: &mut LanguageSync, frame: &[u8], ctx: &mut SessionContext) -> bool {
        let mut reader = FieldReader::new(&frame[4..]);
        let code = reader.code().unwrap();
        node.parse_message(code, &mut reader, ctx).unwrap()
    }

    #[test]
    fn test_construction_registers_trigger_and_drop_unregisters_it() {
        // Arrange
        let owner = SessionId::new_v4();
        let mut events = MockLifecycleEvents::new();
        events
            .expect_register_trigger()
            .withf(move |kind, id, _| *kind == EventKind::ClientConnected && *id == owner)
            .times(1)
            .return_const(());
        events
            .expect_unregister_trigger()
            .withf(move |kind, id| *kind == EventKind::ClientConnected && *id == owner)
            .times(1)
            .return_const(true);
        let deps = ChainDeps {
            session_id: owner,
            events: Arc::new(events),
            on_connected: Arc::new(|| {}) as TriggerCallback,
            keyboard: KeyboardHandle::new(keyboard("en", "en")),
            notifier: Arc::new(RecordingNotify::default()),
        };

        // Act
        let node = LanguageSync::new(Box::new(ProtocolV1_0::new()), &deps);
        drop(node);
        drop(deps);

        // Assert: call counts are verified when the mock is dropped
    }

    #[test]
    fn test_client_connected_sends_local_catalogue() {
        // Arrange
        let mut node = node_with(keyboard("enfr", "en"), Arc::default());
        let mut ctx = SessionContext::new("laptop");

        // Act
        node.client_connected(&mut ctx);

        // Assert
        let frames = ctx.outbox.drain();
        assert_eq!(frames.len(), 1);
        let mut reader = FieldReader::new(&frames[0][4..]);
        assert_eq!(reader.code().unwrap(), MessageCode::LANGUAGE_LIST);
        assert_eq!(LanguageList::read_fields(&mut reader).unwrap().layouts, "enfr");
    }

    #[test]
    fn test_missing_languages_raise_one_notification() {
        // Arrange
        let notifier = Arc::new(RecordingNotify::default());
        let mut node = node_with(keyboard("enfr", "en"), Arc::clone(&notifier));
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageList {
            layouts: "enfrderu".into(),
        }
        .to_frame();

        // Act
        assert!(deliver(&mut node, &frame, &mut ctx));

        // Assert
        let shown = notifier.taken();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, MISSING_LANGUAGES_TITLE);
        assert_eq!(
            shown[0].1,
            "These languages are required for the server to work properly: de ru"
        );
        assert!(ctx.outbox.is_empty());
    }

    #[test]
    fn test_fully_supported_list_raises_no_notification() {
        let notifier = Arc::new(RecordingNotify::default());
        let mut node = node_with(keyboard("enfrde", "en"), Arc::clone(&notifier));
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageList {
            layouts: "enfr".into(),
        }
        .to_frame();

        assert!(deliver(&mut node, &frame, &mut ctx));
        assert!(notifier.taken().is_empty());
    }

    #[test]
    fn test_odd_trailing_character_is_ignored() {
        let notifier = Arc::new(RecordingNotify::default());
        let mut node = node_with(keyboard("en", "en"), Arc::clone(&notifier));
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageList {
            layouts: "enf".into(),
        }
        .to_frame();

        assert!(deliver(&mut node, &frame, &mut ctx));
        assert!(notifier.taken().is_empty());
    }

    #[test]
    fn test_empty_list_raises_no_notification() {
        let notifier = Arc::new(RecordingNotify::default());
        let mut node = node_with(keyboard("en", "en"), Arc::clone(&notifier));
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageList {
            layouts: String::new(),
        }
        .to_frame();

        assert!(deliver(&mut node, &frame, &mut ctx));
        assert!(notifier.taken().is_empty());
    }

    #[test]
    fn test_truncated_language_list_is_decode_error() {
        let mut node = node_with(keyboard("en", "en"), Arc::default());
        let mut ctx = SessionContext::new("laptop");
        let body = FrameBuilder::new(MessageCode::LANGUAGE_LIST).u32(10).finish();
        let mut reader = FieldReader::new(&body[4..]);
        let code = reader.code().unwrap();

        let err = node.parse_message(code, &mut reader, &mut ctx).unwrap_err();

        assert!(matches!(err, ChainError::Decode { code, .. } if code == MessageCode::LANGUAGE_LIST));
    }

    #[test]
    fn test_language_set_switches_installed_layout() {
        // Arrange
        let mut service = keyboard("enfr", "en");
        service
            .expect_set_active_layout()
            .withf(|code| *code == LayoutCode::new('f', 'r'))
            .times(1)
            .return_const(true);
        let notifier = Arc::new(RecordingNotify::default());
        let mut node = node_with(service, Arc::clone(&notifier));
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageSet::new(LayoutCode::new('f', 'r')).to_frame();

        // Act / Assert
        assert!(deliver(&mut node, &frame, &mut ctx));
        assert!(notifier.taken().is_empty());
    }

    #[test]
    fn test_language_set_for_missing_layout_is_not_fatal() {
        let mut service = keyboard("en", "en");
        service
            .expect_set_active_layout()
            .times(1)
            .return_const(false);
        let notifier = Arc::new(RecordingNotify::default());
        let mut node = node_with(service, Arc::clone(&notifier));
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageSet::new(LayoutCode::new('d', 'e')).to_frame();

        assert!(deliver(&mut node, &frame, &mut ctx));
        assert!(notifier.taken().is_empty());
        assert!(ctx.outbox.is_empty());
    }

    #[test]
    fn test_language_set_with_bad_length_is_ignored() {
        let mut service = keyboard("en", "en");
        service.expect_set_active_layout().never();
        let mut node = node_with(service, Arc::default());
        let mut ctx = SessionContext::new("laptop");
        let frame = LanguageSet {
            language: "eng".into(),
        }
        .to_frame();

        assert!(deliver(&mut node, &frame, &mut ctx));
    }

    #[test]
    fn test_enter_writes_active_language_then_base_enter() {
        // Arrange
        let mut node = node_with(keyboard("enfr", "fr"), Arc::default());
        let mut ctx = SessionContext::new("laptop");
        let enter = EnterScreen {
            x: 0,
            y: 0,
            sequence: 1,
            mask: 0,
            for_screensaver: false,
        };

        // Act
        node.enter(&enter, &mut ctx);

        // Assert
        let frames = ctx.outbox.drain();
        assert_eq!(frames.len(), 2);
        let mut first = FieldReader::new(&frames[0][4..]);
        assert_eq!(first.code().unwrap(), MessageCode::LANGUAGE_SET);
        assert_eq!(LanguageSet::read_fields(&mut first).unwrap().language, "fr");
        assert_eq!(
            MessageCode::from_prefix(&frames[1][4..]),
            Some(MessageCode::ENTER)
        );
    }

    #[test]
    fn test_other_codes_fall_back() {
        let mut node = node_with(keyboard("en", "en"), Arc::default());
        let mut ctx = SessionContext::new("laptop");
        let body = MessageCode::CLOSE.as_bytes().to_vec();
        let mut reader = FieldReader::new(&body);
        let code = reader.code().unwrap();

        assert!(!node.parse_message(code, &mut reader, &mut ctx).unwrap());
    }
}
