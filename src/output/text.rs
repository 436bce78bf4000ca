//! Human-readable text report.
//!
//! Emits grouped, emoji-decorated sections: duplicate folders first (one
//! line per folder beats thousands of per-file lines for a copied tree),
//! then duplicate files, a capped unique-file listing, summary
//! statistics, and a trailing warnings block when anything was skipped.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{Confidence, Report};

const SECTION_RULE: &str =
    "============================================================";

/// Text formatter for a [`Report`].
pub struct TextOutput<'a> {
    report: &'a Report,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter borrowing the report.
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Write the full text report.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.write_folders(w)?;
        self.write_files(w)?;
        self.write_unique(w)?;
        self.write_statistics(w)?;
        self.write_warnings(w)?;
        Ok(())
    }

    fn write_folders<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.report.duplicate_folders.is_empty() {
            return Ok(());
        }

        writeln!(w, "{SECTION_RULE}")?;
        writeln!(w, "📂 DUPLICATE FOLDERS FOUND")?;
        writeln!(w, "{SECTION_RULE}")?;

        for (i, group) in self.report.duplicate_folders.iter().enumerate() {
            writeln!(
                w,
                "\n📁 GROUP {}: {} identical folders ({} files, {} each)",
                i + 1,
                group.len(),
                group.file_count,
                ByteSize::b(group.total_bytes)
            )?;
            for dir in &group.dirs {
                writeln!(w, "   • {}", dir.display())?;
            }
            if group.wasted_space() > 0 {
                writeln!(
                    w,
                    "   💾 Potential space savings: {}",
                    ByteSize::b(group.wasted_space())
                )?;
            }
        }
        writeln!(w)?;
        Ok(())
    }

    fn write_files<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.report.duplicate_files.is_empty() {
            if self.report.duplicate_folders.is_empty() {
                writeln!(w, "✅ No duplicate files found.")?;
            }
            return Ok(());
        }

        writeln!(w, "{SECTION_RULE}")?;
        writeln!(w, "🔍 DUPLICATE FILES FOUND")?;
        writeln!(w, "{SECTION_RULE}")?;

        for (i, group) in self.report.duplicate_files.iter().enumerate() {
            writeln!(
                w,
                "\n📁 GROUP {}: {} identical files ({} each)",
                i + 1,
                group.len(),
                ByteSize::b(group.size)
            )?;
            writeln!(w, "   Hash: {}...", &group.hash_hex()[..16])?;
            for path in &group.files {
                writeln!(w, "   • {}", path.display())?;
            }
            if group.wasted_space() > 0 {
                writeln!(
                    w,
                    "   💾 Potential space savings: {}",
                    ByteSize::b(group.wasted_space())
                )?;
            }
        }
        Ok(())
    }

    fn write_unique<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let unique = &self.report.unique_files;

        writeln!(w, "\n{SECTION_RULE}")?;
        writeln!(w, "📄 UNIQUE FILES")?;
        writeln!(w, "{SECTION_RULE}")?;

        if unique.is_empty() {
            writeln!(w, "No unique files found.")?;
            return Ok(());
        }

        writeln!(w, "Found {} unique files", unique.len())?;
        if unique.len() <= 20 {
            for entry in unique {
                writeln!(
                    w,
                    "   • {} ({})",
                    entry.path.display(),
                    ByteSize::b(entry.size)
                )?;
            }
        } else {
            writeln!(w, "Sample of unique files:")?;
            for entry in unique.iter().take(10) {
                writeln!(
                    w,
                    "   • {} ({})",
                    entry.path.display(),
                    ByteSize::b(entry.size)
                )?;
            }
            writeln!(w, "   ... and {} more unique files", unique.len() - 10)?;
        }
        Ok(())
    }

    fn write_statistics<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let s = &self.report.summary;

        writeln!(w, "\n{SECTION_RULE}")?;
        writeln!(w, "📊 SUMMARY STATISTICS")?;
        writeln!(w, "{SECTION_RULE}")?;

        writeln!(w, "📁 Total files scanned: {}", s.total_files)?;
        writeln!(w, "👥 Duplicate files: {}", s.duplicate_files)?;
        writeln!(w, "📄 Unique files: {}", s.unique_files)?;
        writeln!(w, "🔗 Duplicate groups: {}", s.duplicate_groups)?;
        if s.folder_groups > 0 {
            writeln!(w, "📂 Duplicate folder groups: {}", s.folder_groups)?;
        }
        if s.confidence == Confidence::MetadataOnly {
            writeln!(
                w,
                "⚡ Metadata-only mode: matches are by name and size, not content"
            )?;
        }

        if s.reclaimable_bytes > 0 {
            writeln!(w, "\n💾 Space Analysis:")?;
            writeln!(
                w,
                "   Potential space savings: {}",
                ByteSize::b(s.reclaimable_bytes)
            )?;
        }
        writeln!(
            w,
            "\n⏱  Scanned {} in {:.2}s with {} workers",
            ByteSize::b(s.total_bytes),
            s.scan_duration.as_secs_f64(),
            s.workers
        )?;
        writeln!(w, "{SECTION_RULE}")?;
        Ok(())
    }

    fn write_warnings<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.report.warnings.is_empty() {
            return Ok(());
        }

        writeln!(w, "\n⚠️  Processing warnings summary:")?;
        for (kind, count) in &self.report.warnings {
            writeln!(w, "   {}: {}", kind.as_str(), count)?;
        }
        Ok(())
    }
}
