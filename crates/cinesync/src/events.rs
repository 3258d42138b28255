//! Event protocol handlers.
//!
//! [`EventHandler`] turns one inbound event into one registry transition
//! plus the notifications it implies. It is the only code that mutates
//! the registry and the only code that tells the transport who is in
//! which group.
//!
//! Every handler takes the registry lock first and keeps it until all of
//! its emissions are queued. Emission only pushes onto per-connection
//! queues, so the lock is never held across network I/O, and observers
//! see each room's events in the order the registry changed.

use std::time::Instant;

use cinesync_protocol::{
    ChangePlayStateRequest, ClientEvent, Codec, ErrorPayload, InboundFrame,
    JoinRoomRequest, Request, RequestError, SendMessageRequest, ServerEvent,
    UserId, decode_request,
};
use cinesync_room::{
    File, JoinOutcome, Move, Room, RoomError, RoomName, RoomRegistry, User,
    joined_payload,
};
use cinesync_transport::{ConnectionId, Multicast};
use serde_json::Value;
use tokio::sync::Mutex;

pub const INVALID_REQUEST: &str = "Invalid request";
pub const NOT_IN_ROOM: &str = "You are not in any room";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Handles protocol events against a shared [`RoomRegistry`].
///
/// One instance is built at startup and shared by every connection.
pub struct EventHandler<M: Multicast, C: Codec> {
    registry: Mutex<RoomRegistry>,
    multicast: M,
    codec: C,
}

impl<M: Multicast, C: Codec> EventHandler<M, C> {
    pub fn new(multicast: M, codec: C) -> Self {
        Self {
            registry: Mutex::new(RoomRegistry::new()),
            multicast,
            codec,
        }
    }

    /// The transport this handler emits through.
    pub fn multicast(&self) -> &M {
        &self.multicast
    }

    /// The registry, for read-only inspection.
    pub fn registry(&self) -> &Mutex<RoomRegistry> {
        &self.registry
    }

    /// Routes a decoded frame to its handler.
    pub async fn dispatch(&self, conn: ConnectionId, frame: InboundFrame) {
        tracing::trace!(%conn, event = %frame.event, "dispatching");
        match frame.event {
            ClientEvent::JoinRoom => self.join(conn, frame.data).await,
            ClientEvent::LeaveRoom => self.leave(conn).await,
            ClientEvent::ChangePlayState => {
                self.change_play_state(conn, frame.data).await
            }
            ClientEvent::SendMessage => {
                self.send_message(conn, frame.data).await
            }
        }
    }

    // -----------------------------------------------------------------------
    // join-room
    // -----------------------------------------------------------------------

    /// Joins, re-joins, or moves the connection's user into a room.
    pub async fn join(&self, conn: ConnectionId, data: Value) {
        const EVENT: ClientEvent = ClientEvent::JoinRoom;

        let Some(request) = self.decode::<JoinRoomRequest>(conn, EVENT, data).await
        else {
            return;
        };
        let (user, room_name) = match build_entities(conn, request) {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(%conn, error = %e, "validated join built an invalid entity");
                self.reply_error(conn, EVENT, ErrorPayload::message(INTERNAL_ERROR))
                    .await;
                return;
            }
        };

        let mut registry = self.registry.lock().await;

        match registry.add_user(user.clone(), room_name.clone()) {
            JoinOutcome::Joined(room) => {
                tracing::info!(%conn, room = %room.name(), "user joined room");
                self.announce_join(conn, room, false).await;
                return;
            }
            JoinOutcome::AlreadyInRoom(room) => {
                tracing::info!(%conn, room = %room.name(), "user reconnected to room");
                self.announce_join(conn, room, true).await;
                return;
            }
            JoinOutcome::InAnotherRoom(current) => {
                tracing::info!(
                    %conn,
                    from = %current.name(),
                    to = %room_name,
                    "user moving between rooms"
                );
            }
        }

        let Move { previous, room } = registry.move_user(user, room_name);
        if let Some(previous) = previous {
            let group = previous.room.as_str();
            self.multicast.leave_group(conn, group).await;
            let left = ServerEvent::UserLeftRoom {
                user: (&previous.user).into(),
            };
            self.broadcast(group, conn, &left).await;
        }
        self.announce_join(conn, room, false).await;
    }

    /// Puts the connection in the room's group, confirms to the sender and
    /// tells the rest of the room.
    async fn announce_join(&self, conn: ConnectionId, room: &Room, reconnect: bool) {
        let Some(member) = room.user(user_id(conn)) else {
            tracing::error!(%conn, room = %room.name(), "joined user missing from room");
            self.reply_error(
                conn,
                ClientEvent::JoinRoom,
                ErrorPayload::message(INTERNAL_ERROR),
            )
            .await;
            return;
        };

        let group = room.name().as_str();
        self.multicast.join_group(conn, group).await;

        let payload = joined_payload(member, room, Instant::now());
        let (to_sender, to_room) = if reconnect {
            (
                ServerEvent::YouReconnectedToRoom(payload),
                ServerEvent::UserReconnectedToRoom {
                    user: member.into(),
                },
            )
        } else {
            (
                ServerEvent::YouJoinedRoom(payload),
                ServerEvent::UserJoinedRoom {
                    user: member.into(),
                },
            )
        };
        self.emit(conn, &to_sender).await;
        self.broadcast(group, conn, &to_room).await;
    }

    // -----------------------------------------------------------------------
    // leave-room / disconnect
    // -----------------------------------------------------------------------

    /// Takes the connection's user out of its room on request.
    pub async fn leave(&self, conn: ConnectionId) {
        let mut registry = self.registry.lock().await;

        let Some(departure) = registry.remove_user(user_id(conn)) else {
            self.reply_error(
                conn,
                ClientEvent::LeaveRoom,
                ErrorPayload::message(NOT_IN_ROOM),
            )
            .await;
            return;
        };

        tracing::info!(%conn, room = %departure.room, "user left room");
        let group = departure.room.as_str();
        self.multicast.leave_group(conn, group).await;
        self.emit(conn, &ServerEvent::YouLeftRoom {}).await;
        let left = ServerEvent::UserLeftRoom {
            user: (&departure.user).into(),
        };
        self.broadcast(group, conn, &left).await;
    }

    /// Same as [`leave`](Self::leave) for a connection that is gone: the
    /// room is told, the sender is not. Safe to call for a connection that
    /// never joined or already left.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut registry = self.registry.lock().await;

        let Some(departure) = registry.remove_user(user_id(conn)) else {
            return;
        };

        tracing::info!(%conn, room = %departure.room, "user dropped from room");
        let group = departure.room.as_str();
        self.multicast.leave_group(conn, group).await;
        let left = ServerEvent::UserLeftRoom {
            user: (&departure.user).into(),
        };
        self.broadcast(group, conn, &left).await;
    }

    // -----------------------------------------------------------------------
    // change-play-state
    // -----------------------------------------------------------------------

    /// Updates the room's play state and, unless it is a sync, tells the
    /// rest of the room. The sender gets nothing back on success.
    pub async fn change_play_state(&self, conn: ConnectionId, data: Value) {
        const EVENT: ClientEvent = ClientEvent::ChangePlayState;

        let Some(request) =
            self.decode::<ChangePlayStateRequest>(conn, EVENT, data).await
        else {
            return;
        };

        let mut registry = self.registry.lock().await;

        let room = match registry.update_play_state(
            user_id(conn),
            request.play_state,
            request.current_time,
        ) {
            Ok(room) => room,
            Err(RoomError::NotInAnyRoom(_)) => {
                self.reply_error(conn, EVENT, ErrorPayload::message(NOT_IN_ROOM))
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(%conn, error = %e, "play state update failed");
                self.reply_error(conn, EVENT, ErrorPayload::message(INTERNAL_ERROR))
                    .await;
                return;
            }
        };

        if request.is_sync() {
            return;
        }

        let state = room.play_state();
        let changed = ServerEvent::ChangedPlayState(
            state.project(request.is_seek(), state.updated_at()),
        );
        self.broadcast(room.name().as_str(), conn, &changed).await;
    }

    // -----------------------------------------------------------------------
    // send-message
    // -----------------------------------------------------------------------

    /// Relays a chat message to the rest of the sender's room. Nothing is
    /// stored.
    pub async fn send_message(&self, conn: ConnectionId, data: Value) {
        const EVENT: ClientEvent = ClientEvent::SendMessage;

        let Some(request) =
            self.decode::<SendMessageRequest>(conn, EVENT, data).await
        else {
            return;
        };

        let registry = self.registry.lock().await;

        let id = user_id(conn);
        let (Some(user), Some(room)) =
            (registry.find_user_by_id(id), registry.find_room_by_user(id))
        else {
            self.reply_error(conn, EVENT, ErrorPayload::message(NOT_IN_ROOM))
                .await;
            return;
        };

        let sent = ServerEvent::SentMessageToRoom {
            message: request.message,
            user: user.into(),
        };
        self.broadcast(room.name().as_str(), conn, &sent).await;
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Runs the validation gate. On failure the sender is answered and
    /// `None` is returned.
    async fn decode<R: Request>(
        &self,
        conn: ConnectionId,
        event: ClientEvent,
        data: Value,
    ) -> Option<R> {
        match decode_request::<R>(data) {
            Ok(request) => Some(request),
            Err(RequestError::Invalid(fields)) => {
                tracing::debug!(%conn, %event, invalid = fields.len(), "request rejected");
                self.reply_error(conn, event, ErrorPayload::invalid(INVALID_REQUEST, fields))
                    .await;
                None
            }
            Err(RequestError::Malformed(e)) => {
                tracing::error!(%conn, %event, error = %e, "validated request failed to deserialize");
                self.reply_error(conn, event, ErrorPayload::message(INTERNAL_ERROR))
                    .await;
                None
            }
        }
    }

    async fn reply_error(
        &self,
        conn: ConnectionId,
        event: ClientEvent,
        payload: ErrorPayload,
    ) {
        self.emit(conn, &ServerEvent::error_for(event, payload)).await;
    }

    async fn emit(&self, conn: ConnectionId, event: &ServerEvent) {
        match self.codec.encode(event) {
            Ok(bytes) => self.multicast.emit_to(conn, bytes).await,
            Err(e) => tracing::error!(%conn, error = %e, "failed to encode event"),
        }
    }

    async fn broadcast(&self, group: &str, except: ConnectionId, event: &ServerEvent) {
        match self.codec.encode(event) {
            Ok(bytes) => {
                self.multicast.broadcast_except(group, except, bytes).await
            }
            Err(e) => {
                tracing::error!(group, error = %e, "failed to encode event")
            }
        }
    }
}

/// A user is identified by the connection that owns it.
fn user_id(conn: ConnectionId) -> UserId {
    UserId(conn.into_inner())
}

fn build_entities(
    conn: ConnectionId,
    request: JoinRoomRequest,
) -> Result<(User, RoomName), RoomError> {
    let JoinRoomRequest { user, room } = request;
    let file = File::new(user.file.name, user.file.size)?;
    let user = User::new(user_id(conn), user.name, file)?;
    let room = RoomName::new(room.name)?;
    Ok((user, room))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use cinesync_protocol::{JsonCodec, PlayStatus};
    use serde_json::json;

    use super::*;

    // =====================================================================
    // Recording multicast
    // =====================================================================

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Join(u64, String),
        Leave(u64, String),
        Emit(u64, ServerEvent),
        Broadcast(String, u64, ServerEvent),
    }

    #[derive(Default)]
    struct Recorder {
        ops: StdMutex<Vec<Op>>,
    }

    impl Recorder {
        fn push(&self, op: Op) {
            self.ops.lock().unwrap().push(op);
        }
    }

    fn decode(data: &[u8]) -> ServerEvent {
        serde_json::from_slice(data).unwrap()
    }

    impl Multicast for Recorder {
        async fn join_group(&self, conn: ConnectionId, group: &str) {
            self.push(Op::Join(conn.into_inner(), group.to_owned()));
        }

        async fn leave_group(&self, conn: ConnectionId, group: &str) {
            self.push(Op::Leave(conn.into_inner(), group.to_owned()));
        }

        async fn emit_to(&self, conn: ConnectionId, data: Vec<u8>) {
            self.push(Op::Emit(conn.into_inner(), decode(&data)));
        }

        async fn broadcast_except(
            &self,
            group: &str,
            except: ConnectionId,
            data: Vec<u8>,
        ) {
            self.push(Op::Broadcast(
                group.to_owned(),
                except.into_inner(),
                decode(&data),
            ));
        }
    }

    type Handler = EventHandler<Recorder, JsonCodec>;

    fn handler() -> Handler {
        EventHandler::new(Recorder::default(), JsonCodec)
    }

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    /// Drains and returns everything recorded so far.
    fn take(h: &Handler) -> Vec<Op> {
        std::mem::take(&mut *h.multicast().ops.lock().unwrap())
    }

    fn join_data(user: &str, room: &str) -> Value {
        json!({
            "user": {"name": user, "file": {"name": "film.mkv", "size": 123456}},
            "room": {"name": room},
        })
    }

    // =====================================================================
    // join-room
    // =====================================================================

    #[tokio::test]
    async fn test_join_fresh_room() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;

        let ops = take(&h);
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], Op::Join(1, "movie-night".into()));
        let Op::Emit(1, ServerEvent::YouJoinedRoom(joined)) = &ops[1] else {
            panic!("expected you-joined-room, got {:?}", ops[1]);
        };
        assert_eq!(joined.user.name, "alice");
        assert_eq!(joined.user.file.size, 123456);
        assert_eq!(joined.room.name, "movie-night");
        assert_eq!(joined.play_state.play_state, PlayStatus::Stopped);
        assert!(matches!(
            &ops[2],
            Op::Broadcast(room, 1, ServerEvent::UserJoinedRoom { user })
                if room == "movie-night" && user.name == "alice"
        ));

        let registry = h.registry().lock().await;
        assert_eq!(registry.room("movie-night").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_join_same_room_reconnects() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        take(&h);

        h.join(cid(1), join_data("alice", "movie-night")).await;
        let ops = take(&h);
        assert_eq!(ops[0], Op::Join(1, "movie-night".into()));
        assert!(matches!(&ops[1], Op::Emit(1, ServerEvent::YouReconnectedToRoom(_))));
        assert!(matches!(
            &ops[2],
            Op::Broadcast(_, 1, ServerEvent::UserReconnectedToRoom { .. })
        ));

        let registry = h.registry().lock().await;
        assert_eq!(registry.room("movie-night").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_join_other_room_moves_with_leave_first() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        take(&h);

        h.join(cid(1), join_data("alice", "trivia-room")).await;
        let ops = take(&h);
        assert_eq!(ops[0], Op::Leave(1, "movie-night".into()));
        assert!(matches!(
            &ops[1],
            Op::Broadcast(room, 1, ServerEvent::UserLeftRoom { .. }) if room == "movie-night"
        ));
        assert_eq!(ops[2], Op::Join(1, "trivia-room".into()));
        assert!(matches!(&ops[3], Op::Emit(1, ServerEvent::YouJoinedRoom(j)) if j.room.name == "trivia-room"));
        assert!(matches!(
            &ops[4],
            Op::Broadcast(room, 1, ServerEvent::UserJoinedRoom { .. }) if room == "trivia-room"
        ));

        let registry = h.registry().lock().await;
        assert!(registry.room("movie-night").is_none());
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn test_join_invalid_request_reports_fields() {
        let h = handler();
        h.join(cid(1), json!({"user": {"name": "a"}, "room": {}})).await;

        let ops = take(&h);
        assert_eq!(ops.len(), 1);
        let Op::Emit(1, ServerEvent::ErrorJoiningRoom(err)) = &ops[0] else {
            panic!("expected error-joining-room, got {:?}", ops[0]);
        };
        assert_eq!(err.message, INVALID_REQUEST);
        let fields = err.fields.as_ref().unwrap();
        assert!(fields.contains("user.name"));
        assert!(fields.contains("user.file"));
        assert!(fields.contains("room.name"));

        assert_eq!(h.registry().lock().await.room_count(), 0);
    }

    #[tokio::test]
    async fn test_join_oversized_file_size_is_a_field_error() {
        let h = handler();
        for size in [json!(1e20), json!(18446744073709551616.0)] {
            let mut data = join_data("alice", "#1");
            data["user"]["file"]["size"] = size;
            h.join(cid(1), data).await;

            let ops = take(&h);
            assert_eq!(ops.len(), 1);
            let Op::Emit(1, ServerEvent::ErrorJoiningRoom(err)) = &ops[0] else {
                panic!("expected error-joining-room, got {:?}", ops[0]);
            };
            assert_eq!(err.message, INVALID_REQUEST);
            assert!(err.fields.as_ref().unwrap().contains("user.file.size"));
        }
        assert_eq!(h.registry().lock().await.user_count(), 0);
    }

    #[test]
    fn test_user_id_is_the_connection_id() {
        assert_eq!(user_id(cid(9)), UserId(9));
    }

    // =====================================================================
    // leave-room / disconnect
    // =====================================================================

    #[tokio::test]
    async fn test_leave_notifies_sender_and_room() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        h.join(cid(2), join_data("bob", "movie-night")).await;
        take(&h);

        h.leave(cid(1)).await;
        let ops = take(&h);
        assert_eq!(ops[0], Op::Leave(1, "movie-night".into()));
        assert_eq!(ops[1], Op::Emit(1, ServerEvent::YouLeftRoom {}));
        assert!(matches!(
            &ops[2],
            Op::Broadcast(_, 1, ServerEvent::UserLeftRoom { user }) if user.name == "alice"
        ));
    }

    #[tokio::test]
    async fn test_leave_without_room_is_an_error() {
        let h = handler();
        h.leave(cid(5)).await;
        let ops = take(&h);
        assert_eq!(
            ops,
            vec![Op::Emit(
                5,
                ServerEvent::ErrorLeavingRoom(ErrorPayload::message(NOT_IN_ROOM))
            )]
        );
    }

    #[tokio::test]
    async fn test_disconnect_only_tells_the_room() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        h.join(cid(2), join_data("bob", "movie-night")).await;
        take(&h);

        h.disconnect(cid(1)).await;
        let ops = take(&h);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], Op::Leave(1, "movie-night".into()));
        assert!(matches!(&ops[1], Op::Broadcast(_, 1, ServerEvent::UserLeftRoom { .. })));

        // Unjoined or already gone: nothing happens.
        h.disconnect(cid(1)).await;
        h.disconnect(cid(99)).await;
        assert!(take(&h).is_empty());
    }

    // =====================================================================
    // change-play-state
    // =====================================================================

    #[tokio::test]
    async fn test_change_play_state_broadcasts_to_room_only() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        h.join(cid(2), join_data("bob", "movie-night")).await;
        take(&h);

        h.change_play_state(
            cid(2),
            json!({"playState": "PAUSED", "currentTime": 812.5}),
        )
        .await;
        let ops = take(&h);
        assert_eq!(ops.len(), 1);
        let Op::Broadcast(room, 2, ServerEvent::ChangedPlayState(state)) = &ops[0] else {
            panic!("expected changed-play-state, got {:?}", ops[0]);
        };
        assert_eq!(room, "movie-night");
        assert_eq!(state.play_state, PlayStatus::Paused);
        assert_eq!(state.current_time, 812.5);
        assert!(!state.seek);
    }

    #[tokio::test]
    async fn test_change_play_state_carries_seek() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        take(&h);

        h.change_play_state(
            cid(1),
            json!({"playState": "PLAYING", "currentTime": 60, "seek": true}),
        )
        .await;
        let ops = take(&h);
        assert!(matches!(
            &ops[0],
            Op::Broadcast(_, 1, ServerEvent::ChangedPlayState(s)) if s.seek && s.current_time == 60.0
        ));
    }

    #[tokio::test]
    async fn test_sync_updates_state_silently() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        take(&h);

        h.change_play_state(
            cid(1),
            json!({"playState": "PAUSED", "currentTime": 30, "sync": true}),
        )
        .await;
        assert!(take(&h).is_empty());

        let registry = h.registry().lock().await;
        let state = registry.room("movie-night").unwrap().play_state();
        assert_eq!(state.status(), PlayStatus::Paused);
        assert_eq!(state.current_time(), 30.0);
    }

    #[tokio::test]
    async fn test_change_play_state_outside_room() {
        let h = handler();
        h.change_play_state(
            cid(1),
            json!({"playState": "PLAYING", "currentTime": 0}),
        )
        .await;
        let ops = take(&h);
        assert!(matches!(
            &ops[..],
            [Op::Emit(1, ServerEvent::ErrorChangingPlayState(e))] if e.message == NOT_IN_ROOM
        ));
    }

    #[tokio::test]
    async fn test_change_play_state_invalid() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        take(&h);

        h.change_play_state(cid(1), json!({"playState": "REWIND"})).await;
        let ops = take(&h);
        let [Op::Emit(1, ServerEvent::ErrorChangingPlayState(e))] = &ops[..] else {
            panic!("expected one error, got {ops:?}");
        };
        let fields = e.fields.as_ref().unwrap();
        assert!(fields.contains("playState"));
        assert!(fields.contains("currentTime"));
    }

    // =====================================================================
    // send-message
    // =====================================================================

    #[tokio::test]
    async fn test_send_message_fans_out() {
        let h = handler();
        h.join(cid(1), join_data("alice", "movie-night")).await;
        take(&h);

        h.send_message(cid(1), json!({"message": "popcorn?"})).await;
        let ops = take(&h);
        assert!(matches!(
            &ops[..],
            [Op::Broadcast(room, 1, ServerEvent::SentMessageToRoom { message, user })]
                if room == "movie-night" && message == "popcorn?" && user.name == "alice"
        ));
    }

    #[tokio::test]
    async fn test_send_message_errors() {
        let h = handler();
        h.send_message(cid(1), json!({"message": "hi"})).await;
        h.send_message(cid(1), json!({"message": ""})).await;
        let ops = take(&h);
        assert!(matches!(
            &ops[0],
            Op::Emit(1, ServerEvent::ErrorSendingMessage(e)) if e.message == NOT_IN_ROOM
        ));
        assert!(matches!(
            &ops[1],
            Op::Emit(1, ServerEvent::ErrorSendingMessage(e)) if e.message == INVALID_REQUEST
        ));
    }

    // =====================================================================
    // dispatch
    // =====================================================================

    #[tokio::test]
    async fn test_dispatch_routes_by_event() {
        let h = handler();
        let frame: InboundFrame =
            serde_json::from_value(json!({"event": "leave-room"})).unwrap();
        h.dispatch(cid(3), frame).await;
        assert!(matches!(
            &take(&h)[..],
            [Op::Emit(3, ServerEvent::ErrorLeavingRoom(_))]
        ));
    }
}
