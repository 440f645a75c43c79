use serde::Serialize;
use socketioxide::extract::SocketRef;
use uuid::Uuid;

use minichat_shared::middleware::{jwt_secret, validate_jwt};

use crate::hub::user_room;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

/// Authenticates the socket from `?token=` and subscribes it to its user's room.
pub async fn on_connect(socket: SocketRef) {
    let query = socket.req_parts().uri.query().map(str::to_owned);
    let user_id = match authenticate(query.as_deref()) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "chat socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(user_id);
    socket.join(user_room(user_id)).ok();

    tracing::info!(user_id = %user_id, sid = %socket.id, "chat socket connected");

    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));

    socket.on_disconnect(|socket: SocketRef| {
        if let Some(user_id) = get_user_id(&socket) {
            tracing::info!(user_id = %user_id, sid = %socket.id, "chat socket disconnected");
        }
    });
}

fn token_from_query(query: Option<&str>) -> Option<&str> {
    query?.split('&').find_map(|pair| {
        let mut split = pair.splitn(2, '=');
        let key = split.next()?;
        let value = split.next()?;
        (key == "token" && !value.is_empty()).then_some(value)
    })
}

fn authenticate(query: Option<&str>) -> Result<Uuid, String> {
    let token = token_from_query(query).ok_or_else(|| "missing token query parameter".to_string())?;
    let claims = validate_jwt(token, &jwt_secret()).map_err(|e| e.to_string())?;
    if claims.is_expired() {
        return Err("token has expired".into());
    }
    Ok(claims.sub)
}
