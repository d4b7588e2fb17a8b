#![no_main]

use libfuzzer_sys::fuzz_target;
use marcview::{MarcReader, RecoveryMode};

fuzz_target!(|data: &[u8]| {
    for mode in [RecoveryMode::Strict, RecoveryMode::Lenient, RecoveryMode::Permissive] {
        let mut reader = MarcReader::new(data).with_recovery_mode(mode);
        while let Some(result) = reader.next_record() {
            if let Ok(record) = result {
                let _ = marcview::render(&record);
            }
        }
    }
});
