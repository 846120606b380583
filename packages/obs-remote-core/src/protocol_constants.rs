//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the OBS websocket remote plugin and changing
//! them would break interoperability with the server.

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Well-known port the remote plugin listens on.
pub const DEFAULT_PORT: u16 = 4444;

/// Websocket sub-protocol negotiated at connect time.
pub const SUBPROTOCOL: &str = "obsapi";

/// Delay before the single reconnect attempt after a failure (milliseconds).
pub const RECONNECT_DELAY_MS: u64 = 4000;

/// Capacity of the event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Envelope fields
// ─────────────────────────────────────────────────────────────────────────────

/// Outbound request discriminator.
pub const FIELD_REQUEST_TYPE: &str = "request-type";

/// Correlation id, carried as a string on the wire.
pub const FIELD_MESSAGE_ID: &str = "message-id";

/// Push-notification discriminator.
pub const FIELD_UPDATE_TYPE: &str = "update-type";

/// Reply/push status (`"ok"` or `"error"`).
pub const FIELD_STATUS: &str = "status";

/// Error text accompanying `status: "error"`.
pub const FIELD_ERROR: &str = "error";

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

// ─────────────────────────────────────────────────────────────────────────────
// Request types
// ─────────────────────────────────────────────────────────────────────────────

pub const REQ_GET_AUTH_REQUIRED: &str = "GetAuthRequired";
pub const REQ_AUTHENTICATE: &str = "Authenticate";
pub const REQ_GET_STREAMING_STATUS: &str = "GetStreamingStatus";
pub const REQ_GET_SCENE_LIST: &str = "GetSceneList";
pub const REQ_GET_VOLUMES: &str = "GetVolumes";
pub const REQ_TOGGLE_MUTE: &str = "ToggleMute";
pub const REQ_SET_VOLUME: &str = "SetVolume";
pub const REQ_START_STOP_STREAMING: &str = "StartStopStreaming";
pub const REQ_SET_CURRENT_SCENE: &str = "SetCurrentScene";
pub const REQ_SET_SOURCE_RENDER: &str = "SetSourceRender";
pub const REQ_SET_SOURCE_ORDER: &str = "SetSourceOrder";

// ─────────────────────────────────────────────────────────────────────────────
// Update types (push discriminators)
// ─────────────────────────────────────────────────────────────────────────────

pub const UPD_STREAM_STATUS: &str = "StreamStatus";
pub const UPD_STREAM_STARTING: &str = "StreamStarting";
pub const UPD_STREAM_STOPPING: &str = "StreamStopping";
pub const UPD_SWITCH_SCENES: &str = "SwitchScenes";
pub const UPD_SCENES_CHANGED: &str = "ScenesChanged";
pub const UPD_SOURCE_ORDER_CHANGED: &str = "SourceOrderChanged";
pub const UPD_SOURCE_CHANGED: &str = "SourceChanged";
pub const UPD_REPOPULATE_SOURCES: &str = "RepopulateSources";
pub const UPD_VOLUME_CHANGED: &str = "VolumeChanged";

// ─────────────────────────────────────────────────────────────────────────────
// Audio channels
// ─────────────────────────────────────────────────────────────────────────────

pub const CHANNEL_MICROPHONE: &str = "microphone";
pub const CHANNEL_DESKTOP: &str = "desktop";
