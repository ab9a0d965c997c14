use std::io::ErrorKind;
use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use rosc::{OscMessage, OscPacket};

use crate::backend::AudioBackend;
use crate::commands::PlayerCommand;
use crate::controller::PlaybackHandle;
use crate::error::PlaybackError;
use crate::osc_communication::OSCPoller;

/*
    Handler for all incoming osc traffic.

    Messages are turned into PlayerCommands and executed on the shared playback handle. Bundles
        are flattened and their messages executed in order, ignoring the timetag. Anything
        malformed is logged and skipped; the listener never stops on bad input.
*/

// How often the listener thread wakes up to check for shutdown
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub fn flatten_packet(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(msg) => vec![msg],
        OscPacket::Bundle(bundle) => bundle.content.into_iter().flat_map(flatten_packet).collect(),
    }
}

pub fn handle_packet<B: AudioBackend>(handle: &PlaybackHandle<B>, packet: OscPacket) -> Result<(), PlaybackError> {
    for msg in flatten_packet(packet) {
        match PlayerCommand::from_osc_message(&msg) {
            Ok(command) => {
                debug!("Executing {:?}", command);
                match handle.execute(command) {
                    Err(PlaybackError::LockPoisoned) => return Err(PlaybackError::LockPoisoned),
                    Err(e) => warn!("Command {} failed: {}", msg.addr, e),
                    Ok(()) => {}
                }
            }
            Err(e) => warn!("Ignoring message {}: {}", msg.addr, e),
        }
    }
    Ok(())
}

pub struct CommandListener {
    addr: SocketAddrV4,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CommandListener {
    pub fn start<B>(bind_addr: &str, handle: PlaybackHandle<B>) -> Result<CommandListener, PlaybackError>
    where
        B: AudioBackend + Send + 'static,
        B::Pool: Send,
    {
        let mut poller = OSCPoller::new(bind_addr)?;
        poller.set_read_timeout(Some(POLL_TIMEOUT))?;
        let addr = poller.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let loop_running = running.clone();

        let thread = thread::spawn(move || {
            info!("Listening for player commands on {}", addr);

            while loop_running.load(Ordering::SeqCst) {
                match poller.poll() {
                    Ok(packet) => {
                        if let Err(e) = handle_packet(&handle, packet) {
                            error!("Command listener stopping: {}", e);
                            break;
                        }
                    }
                    Err(PlaybackError::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                    Err(e) => warn!("Failed to read incoming OSC: {}", e),
                }
            }

            info!("Command listener stopped");
        });

        Ok(CommandListener {
            addr,
            running,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddrV4 {
        self.addr
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Command listener panicked");
            }
        }
    }
}

impl Drop for CommandListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}
