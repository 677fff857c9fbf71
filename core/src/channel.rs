//! Channel configuration for worker-to-aggregator communication

/// Buffer sizing for the timing-event channel (workers -> stats collector)
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Timing channel buffer size
    pub timing_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timing_buffer: 1024,
        }
    }
}

impl ChannelConfig {
    /// Create a config with a custom timing buffer size.
    pub fn with_timing_buffer(mut self, size: usize) -> Self {
        self.timing_buffer = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.timing_buffer, 1024);
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::default().with_timing_buffer(64);
        assert_eq!(config.timing_buffer, 64);
    }
}
