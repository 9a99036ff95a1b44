//! Live session: account, channel lists and playback navigation

pub mod account;
pub mod channels;
pub mod naming;

pub use account::AccountService;
pub use channels::ChannelSession;
pub use naming::NameCache;
