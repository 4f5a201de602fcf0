use anyhow::anyhow;
use ducksoup_protocol::{ClientMessage, EmbedMessage, ServerMessage};
use log::{debug, error, info};

use crate::constants::CLOSE_NORMAL;
use crate::player::{post_message, DuckSoup};
use crate::utils::{add_ice_candidate, create_sdp_answer, send_signal, user_agent};

/// The server drives the session: it offers, the player answers,
/// both trickle candidates, then the server announces start and end.
pub async fn handle_websocket_message(message: ServerMessage, player: DuckSoup) -> crate::Result<()> {
    match message {
        ServerMessage::Offer(ref offer) => {
            let (peer_connection, websocket) = {
                let inner = player.inner.borrow();
                (inner.peer_connection.clone(), inner.websocket.clone())
            };
            let peer_connection =
                peer_connection.ok_or_else(|| anyhow!("received an offer without peer connection"))?;
            let websocket =
                websocket.ok_or_else(|| anyhow!("received an offer without websocket"))?;

            let answer = create_sdp_answer(&peer_connection, offer, &user_agent()).await?;
            debug!("received an offer and created an answer: {}", answer.sdp);
            send_signal(&websocket, &ClientMessage::Answer(answer))?;
        }
        ServerMessage::Candidate(ref ice_candidate) => {
            debug!("peer received ice candidate: {:?}", ice_candidate);
            let peer_connection = player.inner.borrow().peer_connection.clone();
            let Some(peer_connection) = peer_connection else {
                return Err(anyhow!("received a candidate without peer connection"));
            };
            if let Err(err) = add_ice_candidate(&peer_connection, ice_candidate).await {
                error!("{:#}", err);
            }
        }
        ServerMessage::Start => {
            info!("session started");
            // the player may not be marked as running yet when the server starts
            post_message(&player, &EmbedMessage::start(), true);
        }
        ServerMessage::Ending => {
            post_message(&player, &EmbedMessage::ending(), false);
        }
        ServerMessage::End | ServerMessage::Error { .. } => {
            info!("session stopped by server: {:?}", message);
            post_message(&player, &EmbedMessage::from(&message), false);
            player.stop(Some(CLOSE_NORMAL));
        }
        ServerMessage::Unknown(ref kind) => {
            debug!("ignoring signaling message of kind {}", kind);
        }
    }

    Ok(())
}
