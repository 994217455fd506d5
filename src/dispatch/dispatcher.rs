//! Maps decoded watch events to phone-side actions and host notifications
//! to outbound watch commands.

use std::sync::Arc;

use log::{debug, info};

use crate::core::bluetooth::{
    OutboundCommand, PlaybackAction, SMS_PACKAGE_ALLOWLIST, WatchEvent,
};
use crate::dispatch::media::{Alerter, AudioController, MediaKey};
use crate::notifications::NotificationEvent;

/// Follow-up the link supervisor performs after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    None,
    /// The camera-shutter frame also resyncs the watch clock.
    SyncDateTime,
}

pub struct CommandDispatcher {
    audio: Arc<dyn AudioController>,
    alerter: Arc<dyn Alerter>,
}

impl CommandDispatcher {
    pub fn new(audio: Arc<dyn AudioController>, alerter: Arc<dyn Alerter>) -> Self {
        Self { audio, alerter }
    }

    /// Phone-side action for one decoded watch frame.
    pub fn handle_watch_event(&self, event: WatchEvent) -> DispatchOutcome {
        match event {
            WatchEvent::Playback(action) => {
                self.handle_playback(action);
                DispatchOutcome::None
            }
            WatchEvent::FindPhone => {
                info!("Find-phone requested");
                self.alerter.play_notification_sound();
                DispatchOutcome::None
            }
            WatchEvent::CameraShutter => {
                info!("Camera shutter requested");
                self.alerter.post_error("Error", "Remote camera not implemented");
                self.alerter.play_notification_sound();
                DispatchOutcome::SyncDateTime
            }
        }
    }

    fn handle_playback(&self, action: PlaybackAction) {
        match action {
            PlaybackAction::PlayPause => {
                let key = if self.audio.is_media_active() {
                    MediaKey::Pause
                } else {
                    MediaKey::Play
                };
                self.audio.dispatch_media_key(key);
            }
            PlaybackAction::NextTrack => self.audio.dispatch_media_key(MediaKey::NextTrack),
            PlaybackAction::PreviousTrack => {
                self.audio.dispatch_media_key(MediaKey::PreviousTrack);
            }
            PlaybackAction::VolumeUp => self.audio.set_volume(self.audio.volume() + 1),
            PlaybackAction::VolumeDown => self.audio.set_volume(self.audio.volume() - 1),
            PlaybackAction::Unknown(mask) => {
                debug!("Unknown playback action mask 0x{:02x}", mask);
            }
        }
    }

    /// SMS reminder for an allow-listed notification source, if any.
    pub fn reminder_for(&self, event: &NotificationEvent) -> Option<OutboundCommand> {
        if SMS_PACKAGE_ALLOWLIST.contains(&event.package.as_str()) {
            info!(
                "Notification from {} ({}); reminding watch",
                event.package, event.title
            );
            Some(OutboundCommand::SmsReminder)
        } else {
            debug!("{} not in the reminder allow-list", event.package);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FakeAudio {
        active: bool,
        volume: Mutex<i32>,
        keys: Mutex<Vec<MediaKey>>,
    }

    impl FakeAudio {
        fn new(active: bool, volume: i32) -> Self {
            Self { active, volume: Mutex::new(volume), keys: Mutex::new(Vec::new()) }
        }
    }

    impl AudioController for FakeAudio {
        fn is_media_active(&self) -> bool {
            self.active
        }
        fn dispatch_media_key(&self, key: MediaKey) {
            self.keys.lock().unwrap().push(key);
        }
        fn volume(&self) -> i32 {
            *self.volume.lock().unwrap()
        }
        fn set_volume(&self, level: i32) {
            *self.volume.lock().unwrap() = level;
        }
    }

    #[derive(Default)]
    struct FakeAlerter {
        sounds: Mutex<usize>,
        errors: Mutex<Vec<String>>,
    }

    impl Alerter for FakeAlerter {
        fn play_notification_sound(&self) {
            *self.sounds.lock().unwrap() += 1;
        }
        fn post_error(&self, title: &str, body: &str) {
            self.errors.lock().unwrap().push(format!("{}: {}", title, body));
        }
    }

    fn make_dispatcher(active: bool) -> (CommandDispatcher, Arc<FakeAudio>, Arc<FakeAlerter>) {
        let audio = Arc::new(FakeAudio::new(active, 5));
        let alerter = Arc::new(FakeAlerter::default());
        (CommandDispatcher::new(audio.clone(), alerter.clone()), audio, alerter)
    }

    #[test]
    fn play_pause_follows_media_activity() {
        let (dispatcher, audio, _) = make_dispatcher(false);
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::PlayPause));
        assert_eq!(*audio.keys.lock().unwrap(), vec![MediaKey::Play]);

        let (dispatcher, audio, _) = make_dispatcher(true);
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::PlayPause));
        assert_eq!(*audio.keys.lock().unwrap(), vec![MediaKey::Pause]);
    }

    #[test]
    fn volume_moves_exactly_one_unit() {
        let (dispatcher, audio, _) = make_dispatcher(false);
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::VolumeUp));
        assert_eq!(audio.volume(), 6);
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::VolumeDown));
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::VolumeDown));
        assert_eq!(audio.volume(), 4);
    }

    #[test]
    fn track_keys_pass_through() {
        let (dispatcher, audio, _) = make_dispatcher(false);
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::NextTrack));
        dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::PreviousTrack));
        assert_eq!(
            *audio.keys.lock().unwrap(),
            vec![MediaKey::NextTrack, MediaKey::PreviousTrack]
        );
    }

    #[test]
    fn unknown_playback_mask_does_nothing() {
        let (dispatcher, audio, alerter) = make_dispatcher(false);
        let outcome =
            dispatcher.handle_watch_event(WatchEvent::Playback(PlaybackAction::Unknown(0x42)));
        assert_eq!(outcome, DispatchOutcome::None);
        assert!(audio.keys.lock().unwrap().is_empty());
        assert_eq!(*alerter.sounds.lock().unwrap(), 0);
    }

    #[test]
    fn find_phone_plays_the_sound_once() {
        let (dispatcher, _, alerter) = make_dispatcher(false);
        dispatcher.handle_watch_event(WatchEvent::FindPhone);
        assert_eq!(*alerter.sounds.lock().unwrap(), 1);
    }

    #[test]
    fn camera_shutter_alerts_and_requests_time_sync() {
        let (dispatcher, _, alerter) = make_dispatcher(false);
        let outcome = dispatcher.handle_watch_event(WatchEvent::CameraShutter);
        assert_eq!(outcome, DispatchOutcome::SyncDateTime);
        assert_eq!(*alerter.sounds.lock().unwrap(), 1);
        assert_eq!(
            *alerter.errors.lock().unwrap(),
            vec!["Error: Remote camera not implemented".to_string()]
        );
    }

    #[test]
    fn only_allowlisted_packages_produce_a_reminder() {
        let (dispatcher, _, _) = make_dispatcher(false);
        let messaging =
            NotificationEvent::new("com.google.android.apps.messaging", "Bob", "hello");
        let mail = NotificationEvent::new("com.zoho.mail", "Inbox", "1 new message");
        let other = NotificationEvent::new("com.example.game", "Play now", "!!!");

        assert_eq!(dispatcher.reminder_for(&messaging), Some(OutboundCommand::SmsReminder));
        assert_eq!(dispatcher.reminder_for(&mail), Some(OutboundCommand::SmsReminder));
        assert_eq!(dispatcher.reminder_for(&other), None);
    }
}
