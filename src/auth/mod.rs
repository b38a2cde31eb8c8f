/*!
 * # Session Module
 *
 * Tracks which user is signed in. Sign-in itself happens with an external
 * identity provider; every inventory and history operation is gated on the
 * session holding an identity.
 */

pub mod session;

pub use session::{Session, UserProfile};
