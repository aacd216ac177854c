/// Version of the JSON-RPC protocol used by the legacy `send`/`sendAsync` surface.
pub const JSON_RPC_VERSION_STR: &str = "2.0";

/// Portal channel every forwarded call travels on.
pub const ETH_REQUEST_CHANNEL: &str = "eth_request";

/// Code attached to failures reported through `sendAsync`.
pub const INTERNAL_ERROR_CODE: i32 = -32000;

// EIP-1193 provider error codes.
//
// See <https://eips.ethereum.org/EIPS/eip-1193#provider-errors>
pub const USER_REJECTED_REQUEST: i32 = 4001;
pub const UNAUTHORIZED: i32 = 4100;
pub const UNSUPPORTED_METHOD: i32 = 4200;
pub const DISCONNECTED: i32 = 4900;
pub const CHAIN_DISCONNECTED: i32 = 4901;

/// Chain assumed when neither the client nor the options name one.
pub const DEFAULT_CHAIN_ID: u64 = 1;
