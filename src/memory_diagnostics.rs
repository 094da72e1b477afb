//! Heap and PSRAM readings for the idle loop and /status
use esp_idf_sys::*;

/// Heap figures in bytes
#[derive(Debug, Clone, Copy)]
pub struct MemoryStats {
    pub free_heap: u32,
    pub min_free_heap: u32,
    pub internal_largest: u32,
    pub psram_free: u32,
}

impl MemoryStats {
    pub fn current() -> Self {
        unsafe {
            Self {
                free_heap: esp_get_free_heap_size(),
                min_free_heap: esp_get_minimum_free_heap_size(),
                internal_largest: heap_caps_get_largest_free_block(MALLOC_CAP_INTERNAL as u32) as u32,
                psram_free: heap_caps_get_free_size(MALLOC_CAP_SPIRAM as u32) as u32,
            }
        }
    }
}

/// Log current memory state. Frame buffers live in PSRAM, so a shrinking
/// PSRAM figure with no open streams points at a leaked frame.
pub fn log_memory_state(label: &str, active_streams: u32) {
    let stats = MemoryStats::current();

    log::info!(
        "Memory [{}]: heap free={} KB (min {} KB), largest internal={} KB, PSRAM free={} KB, streams={}",
        label,
        stats.free_heap / 1024,
        stats.min_free_heap / 1024,
        stats.internal_largest / 1024,
        stats.psram_free / 1024,
        active_streams
    );

    if stats.internal_largest < 4096 {
        log::error!("CRITICAL: Internal DRAM largest block < 4KB!");
    }
}
