use std::fs::File;
use std::io::{Read, Seek};

/// Wraps a trace file in a reader suited to one sequential pass
pub fn get_reader(file: File) -> std::io::Result<impl Read + Seek> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        // 4096 is the standard block size (or a multiple of it) on most systems
        const BUFFER_SIZE: usize = 16 * 4096;
        Ok(BufReader::with_capacity(BUFFER_SIZE, file))
    }
    // Memory map the file on unix systems, traces are read front to back exactly once
    #[cfg(unix)]
    {
        use std::io::Cursor;
        use memmap2::{Advice, Mmap};
        // Safety: the mapping is read-only and lives only as long as the load, the trace file is
        // not expected to be modified while the simulator starts up
        unsafe {
            let m = Mmap::map(&file)?;
            m.advise(Advice::Sequential)?;
            Ok(Cursor::new(m))
        }
    }
}
