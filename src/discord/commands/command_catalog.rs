// Discord commands module.
// Each feature gets its own command file.

pub mod automod;

// Bot presence management
pub mod presence;
