use rosc::{OscMessage, OscType};

use crate::backend::{Timbre, VoiceSettings};
use crate::error::PlaybackError;
use crate::model::Role;

/*
    Commands the UI layer can send to the player.

    OSC format:
        /play  [role: string, offset: float (optional, default 0.0)]
        /seek  [role: string, offset: float]
        /stop  []
        /voice [timbre: string, volume_db: float]
 */
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play { role: Role, offset: f64 },
    Seek { role: Role, offset: f64 },
    Stop,
    SetVoice(VoiceSettings),
}

impl PlayerCommand {
    pub fn from_osc_message(msg: &OscMessage) -> Result<PlayerCommand, PlaybackError> {
        match msg.addr.as_str() {
            "/play" => {
                let role = get_role_at(msg, 0)?;
                let offset = match msg.args.get(1) {
                    Some(_) => get_float_at(msg, 1, "offset")?,
                    None => 0.0,
                };
                Ok(PlayerCommand::Play { role, offset })
            }
            "/seek" => Ok(PlayerCommand::Seek {
                role: get_role_at(msg, 0)?,
                offset: get_float_at(msg, 1, "offset")?,
            }),
            "/stop" => Ok(PlayerCommand::Stop),
            "/voice" => {
                let timbre_name = get_string_at(msg, 0, "timbre")?;
                let timbre = Timbre::parse(&timbre_name)
                    .ok_or_else(|| PlaybackError::InvalidCommand(format!("Unknown timbre: {}", timbre_name)))?;
                let volume_db = get_float_at(msg, 1, "volume_db")?;
                Ok(PlayerCommand::SetVoice(VoiceSettings { timbre, volume_db }))
            }
            other => Err(PlaybackError::InvalidCommand(format!("Unknown address: {}", other))),
        }
    }
}

fn get_string_at(msg: &OscMessage, index: usize, name: &str) -> Result<String, PlaybackError> {
    msg.args
        .get(index)
        .and_then(|arg| arg.clone().string())
        .ok_or_else(|| PlaybackError::InvalidCommand(format!("{} string not found as {}th arg of {}", name, index, msg.addr)))
}

// Accepts any numeric OSC type, since senders disagree on float vs double vs int
fn get_float_at(msg: &OscMessage, index: usize, name: &str) -> Result<f64, PlaybackError> {
    let value = match msg.args.get(index) {
        Some(OscType::Float(value)) => Some(*value as f64),
        Some(OscType::Double(value)) => Some(*value),
        Some(OscType::Int(value)) => Some(*value as f64),
        Some(OscType::Long(value)) => Some(*value as f64),
        _ => None,
    };

    value
        .filter(|value| value.is_finite())
        .ok_or_else(|| PlaybackError::InvalidCommand(format!("{} number not found as {}th arg of {}", name, index, msg.addr)))
}

fn get_role_at(msg: &OscMessage, index: usize) -> Result<Role, PlaybackError> {
    get_string_at(msg, index, "role")?.parse()
}
