//! SG2 wire codec
//! This module translates the watch's binary command frames to and from
//! typed events. The byte values are fixed by the watch firmware.

use thiserror::Error;

use crate::core::bluetooth::constants::CCC_ENABLE_NOTIFICATIONS;

const CMD_PLAYBACK: u8 = 0x65;
const CMD_FIND_PHONE: u8 = 0x61;
/// Shares its leading byte with the playback class; matched as a full frame.
const CAMERA_SHUTTER_FRAME: [u8; 2] = [0x65, 0x29];

const PLAYBACK_PLAY_PAUSE: u8 = 0x01;
const PLAYBACK_VOL_UP: u8 = 0x20;
const PLAYBACK_VOL_DOWN: u8 = 0x10;
const PLAYBACK_NEXT: u8 = 0x08;
const PLAYBACK_PREVIOUS: u8 = 0x04;

const CMD_SET_TIME: u8 = 0x09;
const CMD_SET_DATE: u8 = 0x08;
const CMD_SMS_REMIND: u8 = 0x07;
/// -86 as an unsigned byte
const SMS_REMIND_VALUE: u8 = 0xAA;

/// Playback action carried in byte 1 of a playback frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    PlayPause,
    VolumeUp,
    VolumeDown,
    NextTrack,
    PreviousTrack,
    /// Action mask the firmware is not known to send; ignored downstream
    Unknown(u8),
}

/// Decoded inbound frame from the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Playback(PlaybackAction),
    FindPhone,
    CameraShutter,
}

/// Outbound command for the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Client-configuration value for the notify characteristic's
    /// descriptor, not a characteristic write
    EnableNotifications,
    SetTime { hour: u8, minute: u8, second: u8 },
    SetDate { day: u8, month: u8 },
    SmsReminder,
}

/// A frame the codec could not make sense of
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    #[error("playback frame missing action byte")]
    Truncated,
    #[error("unknown command class 0x{0:02x}")]
    UnknownCommand(u8),
}

/// Decodes one notification payload from the watch.
///
/// The camera shutter frame is matched in full before the generic playback
/// decode; a prefix check would misread it as a playback command.
pub fn decode(payload: &[u8]) -> Result<WatchEvent, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    if payload == CAMERA_SHUTTER_FRAME {
        return Ok(WatchEvent::CameraShutter);
    }
    match payload[0] {
        CMD_PLAYBACK => {
            let action = match *payload.get(1).ok_or(DecodeError::Truncated)? {
                PLAYBACK_PLAY_PAUSE => PlaybackAction::PlayPause,
                PLAYBACK_VOL_UP => PlaybackAction::VolumeUp,
                PLAYBACK_VOL_DOWN => PlaybackAction::VolumeDown,
                PLAYBACK_NEXT => PlaybackAction::NextTrack,
                PLAYBACK_PREVIOUS => PlaybackAction::PreviousTrack,
                other => PlaybackAction::Unknown(other),
            };
            Ok(WatchEvent::Playback(action))
        }
        CMD_FIND_PHONE => Ok(WatchEvent::FindPhone),
        other => Err(DecodeError::UnknownCommand(other)),
    }
}

impl OutboundCommand {
    /// Convert the command to its byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            Self::EnableNotifications => CCC_ENABLE_NOTIFICATIONS.to_vec(),
            Self::SetTime { hour, minute, second } => vec![CMD_SET_TIME, hour, minute, second],
            // The two 0x01 bytes and the month-before-day order are fixed
            // by the watch firmware.
            Self::SetDate { day, month } => vec![CMD_SET_DATE, 0x01, 0x01, month, day],
            Self::SmsReminder => vec![CMD_SMS_REMIND, SMS_REMIND_VALUE],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_shutter_beats_playback_prefix() {
        assert_eq!(decode(&[0x65, 0x29]), Ok(WatchEvent::CameraShutter));
    }

    #[test]
    fn playback_actions_decode() {
        let cases = [
            (0x01, PlaybackAction::PlayPause),
            (0x20, PlaybackAction::VolumeUp),
            (0x10, PlaybackAction::VolumeDown),
            (0x08, PlaybackAction::NextTrack),
            (0x04, PlaybackAction::PreviousTrack),
        ];
        for (mask, action) in cases {
            assert_eq!(decode(&[0x65, mask]), Ok(WatchEvent::Playback(action)));
        }
    }

    #[test]
    fn unknown_playback_mask_is_tolerated() {
        assert_eq!(
            decode(&[0x65, 0x42]),
            Ok(WatchEvent::Playback(PlaybackAction::Unknown(0x42)))
        );
    }

    #[test]
    fn find_phone_decodes() {
        assert_eq!(decode(&[0x61]), Ok(WatchEvent::FindPhone));
    }

    #[test]
    fn malformed_payloads_error() {
        assert_eq!(decode(&[]), Err(DecodeError::Empty));
        assert_eq!(decode(&[0x65]), Err(DecodeError::Truncated));
        assert_eq!(decode(&[0x13, 0x37]), Err(DecodeError::UnknownCommand(0x13)));
    }

    #[test]
    fn outbound_encodings_are_bit_exact() {
        assert_eq!(OutboundCommand::EnableNotifications.to_bytes(), vec![0x01, 0x00]);
        assert_eq!(
            OutboundCommand::SetTime { hour: 13, minute: 7, second: 42 }.to_bytes(),
            vec![0x09, 13, 7, 42]
        );
        assert_eq!(
            OutboundCommand::SetDate { day: 5, month: 3 }.to_bytes(),
            vec![0x08, 0x01, 0x01, 0x03, 0x05]
        );
        assert_eq!(OutboundCommand::SmsReminder.to_bytes(), vec![0x07, 0xAA]);
    }

    /// Inverse of `to_bytes` for the characteristic-write commands; test
    /// helper only, the watch never echoes these frames back.
    fn decode_outbound(bytes: &[u8]) -> Option<OutboundCommand> {
        match *bytes {
            [CMD_SET_TIME, hour, minute, second] => {
                Some(OutboundCommand::SetTime { hour, minute, second })
            }
            [CMD_SET_DATE, 0x01, 0x01, month, day] => {
                Some(OutboundCommand::SetDate { day, month })
            }
            [CMD_SMS_REMIND, SMS_REMIND_VALUE] => Some(OutboundCommand::SmsReminder),
            _ => None,
        }
    }

    #[test]
    fn outbound_commands_round_trip() {
        let commands = [
            OutboundCommand::SetTime { hour: 23, minute: 59, second: 1 },
            OutboundCommand::SetDate { day: 28, month: 11 },
            OutboundCommand::SmsReminder,
        ];
        for command in commands {
            assert_eq!(decode_outbound(&command.to_bytes()), Some(command));
        }
    }
}
