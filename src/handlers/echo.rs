//! Demo stream application.
//!
//! Plays inbound audio straight back to the caller, places a checkpoint
//! after every DTMF digit, flushes queued audio when `*` is pressed, and
//! logs every event.

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::stream::{
    AudioPayload, ClearedAudioEvent, DtmfEvent, HandlerResult, MediaEvent, PlayedStreamEvent,
    StartEvent, StreamError, StreamSession, StreamTransport, StreamingHandler,
};

/// Digit that interrupts queued playback.
pub const CLEAR_DIGIT: char = '*';

/// Register the demo handlers on a new [`StreamingHandler`].
pub fn build_echo_handler<T>(transport: T, config: &ServerConfig) -> StreamingHandler
where
    T: StreamTransport + 'static,
{
    let mut handler = StreamingHandler::with_config(transport, config.stream_config());
    let session = handler.session();
    let echo = config.echo_media;

    handler
        .on_connected(on_connected)
        .on_start(on_start)
        .on_dtmf({
            let session = session.clone();
            move |event| on_dtmf(session.clone(), event)
        })
        .on_played_stream(on_played_stream)
        .on_cleared_audio(on_cleared_audio)
        .on_error(on_error)
        .on_disconnected(on_disconnected);

    if echo {
        handler.on_media(move |event| echo_media(session.clone(), event));
    }

    handler
}

/// Run the demo application until the connection ends.
pub async fn run_echo_session<T>(transport: T, config: &ServerConfig)
where
    T: StreamTransport + 'static,
{
    if let Err(e) = build_echo_handler(transport, config).start().await {
        warn!(error = %e, "Media stream ended with an error");
    }
}

async fn on_connected() -> HandlerResult {
    info!("Plivo connected");
    Ok(())
}

async fn on_disconnected() -> HandlerResult {
    info!("Plivo disconnected");
    Ok(())
}

async fn on_start(event: StartEvent) -> HandlerResult {
    info!(
        call_id = %event.start.call_id,
        stream_id = %event.start.stream_id,
        tracks = ?event.start.tracks,
        encoding = %event.start.media_format.encoding,
        sample_rate = event.start.media_format.sample_rate,
        "Stream start"
    );
    Ok(())
}

async fn echo_media(session: StreamSession, event: MediaEvent) -> HandlerResult {
    session
        .send_media_default(AudioPayload::base64(event.media.payload))
        .await?;
    Ok(())
}

async fn on_dtmf(session: StreamSession, event: DtmfEvent) -> HandlerResult {
    let digit = event.dtmf.digit;
    info!(%digit, "DTMF received");

    if digit == CLEAR_DIGIT {
        session.send_clear_audio().await?;
    }
    session.send_checkpoint(format!("dtmf-{digit}")).await?;
    Ok(())
}

async fn on_played_stream(event: PlayedStreamEvent) -> HandlerResult {
    info!(name = %event.name, "Checkpoint played");
    Ok(())
}

async fn on_cleared_audio(event: ClearedAudioEvent) -> HandlerResult {
    info!(stream_id = %event.stream_id, "Audio cleared");
    Ok(())
}

async fn on_error(err: StreamError) -> HandlerResult {
    warn!(error = %err, "Stream error");
    Ok(())
}
