//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Colloquy Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[stream]
# max_pending_chunks = 256   # 1-65536, out-of-order chunks held per turn
# event_capacity = 1024      # 16-65536

[activity]
# research_keywords = ["research", "investigate", "analyze", "compare", "size", "scope"]
# coding_models = ["code", "claude", "gpt-4", "sonnet", "opus"]
# progress_scale_chars = 2000

[context]
# warn_percent = 75.0        # 1-100
# critical_percent = 90.0    # 1-100, must exceed warn_percent
# poll_interval_secs = 30    # 0 disables idle polling
# default_budget_tokens = 200000

[scroll]
# pin_threshold = 100.0      # content units from the bottom

[storage]
# directory = "/path/to/histories"

[logging]
level = "info"               # trace, debug, info, warn, error
"##
    .to_string()
}
