//! I/O option flags shared by the format readers and writers.

use bitflags::bitflags;

bitflags! {
    /// A small bag of flags carrying caller intent into a read or write call
    /// and observed file characteristics back out of it.
    ///
    /// On the way in, attribute flags say which attributes the caller wants
    /// materialized and `CUSTOM` whether unrecognized properties should be
    /// stored as named attributes. On the way out they say what the file
    /// actually provided.
    pub struct Options: u16 {
        const BINARY = 0x0001;
        const MSB = 0x0002;
        const LSB = 0x0004;
        const SWAP = 0x0008;
        const VERTEX_NORMAL = 0x0010;
        const VERTEX_TEXCOORD = 0x0020;
        const VERTEX_COLOR = 0x0040;
        const COLOR_ALPHA = 0x0080;
        const COLOR_FLOAT = 0x0100;
        const FACE_COLOR = 0x0200;
        const FACE_TEXCOORD = 0x0400;
        const TEX_FILE = 0x0800;
        const CUSTOM = 0x1000;
    }
}

impl Options {
    pub fn is_binary(self) -> bool {
        self.contains(Options::BINARY)
    }

    pub fn vertex_has_normal(self) -> bool {
        self.contains(Options::VERTEX_NORMAL)
    }

    pub fn vertex_has_texcoord(self) -> bool {
        self.contains(Options::VERTEX_TEXCOORD)
    }

    pub fn vertex_has_color(self) -> bool {
        self.contains(Options::VERTEX_COLOR)
    }

    pub fn color_is_float(self) -> bool {
        self.contains(Options::COLOR_FLOAT)
    }

    pub fn color_has_alpha(self) -> bool {
        self.contains(Options::COLOR_ALPHA)
    }

    pub fn face_has_texcoord(self) -> bool {
        self.contains(Options::FACE_TEXCOORD)
    }

    pub fn has_texfile(self) -> bool {
        self.contains(Options::TEX_FILE)
    }

    /// What a read call reports back: the intersection of what the caller
    /// asked for and what the file contained. Encoding facts (`BINARY`,
    /// `COLOR_FLOAT`, `TEX_FILE`) are surfaced whenever observed, requested
    /// or not, and the caller's `SWAP` bit passes through untouched.
    pub fn reconcile(requested: Options, observed: Options) -> Options {
        let surfaced = observed & (Options::BINARY | Options::COLOR_FLOAT | Options::TEX_FILE);
        (requested & observed) | surfaced | (requested & Options::SWAP)
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_is_an_intersection() {
        let requested = Options::VERTEX_NORMAL | Options::VERTEX_COLOR;
        let observed = Options::VERTEX_COLOR | Options::VERTEX_TEXCOORD;
        let out = Options::reconcile(requested, observed);
        assert!(out.vertex_has_color());
        assert!(!out.vertex_has_normal());
        assert!(!out.vertex_has_texcoord());
    }

    #[test]
    fn encoding_facts_are_always_surfaced() {
        let observed = Options::BINARY | Options::LSB | Options::COLOR_FLOAT | Options::TEX_FILE;
        let out = Options::reconcile(Options::empty(), observed);
        assert!(out.is_binary());
        assert!(out.color_is_float());
        assert!(out.has_texfile());
        // endianness detail is only echoed when asked for
        assert!(!out.contains(Options::LSB));
    }

    #[test]
    fn swap_is_preserved_from_the_request() {
        let out = Options::reconcile(Options::SWAP, Options::empty());
        assert!(out.contains(Options::SWAP));
    }
}
