/*!
    Pixel and sample format types, and their graph-side translations.

    This module is the only place that interprets the graph's textual format
    names. Everything else in the family works with the typed enums defined
    here.
*/

/**
    One plane of a raw video buffer: byte offset into the buffer plus the
    stride (bytes per row) of the plane.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Plane {
    /// Byte offset of the plane from the start of the buffer.
    pub offset: usize,
    /// Bytes per row within the plane.
    pub stride: usize,
}

/**
    Host video pixel formats.

    These are the raw formats the bridge can carry across the host/graph
    boundary. Planar 4:2:0 comes in two variants (fully planar and
    semi-planar), packed 4:2:2 in three byte orderings, plus planar 4:4:4
    and the 32-bit packed RGB/BGR variants.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    /// Planar YUV 4:2:0 with separate chroma planes.
    I420,
    /// Semi-planar YUV 4:2:0 with interleaved chroma.
    Nv12,
    /// Packed YUV 4:2:2, Y0-U-Y1-V byte order.
    Yuy2,
    /// Packed YUV 4:2:2, Y0-V-Y1-U byte order.
    Yvyu,
    /// Packed YUV 4:2:2, U-Y0-V-Y1 byte order.
    Uyvy,
    /// Planar YUV 4:4:4.
    I444,
    /// Packed RGBA, 32bpp.
    Rgba,
    /// Packed BGRA, 32bpp.
    Bgra,
    /// Packed BGRX (alpha ignored), 32bpp.
    Bgrx,
}

impl VideoFormat {
    /**
        The graph-side name of this format, as used in capability
        descriptors and graph descriptions.
    */
    pub const fn graph_name(self) -> &'static str {
        match self {
            Self::I420 => "I420",
            Self::Nv12 => "NV12",
            Self::Yuy2 => "YUY2",
            Self::Yvyu => "YVYU",
            Self::Uyvy => "UYVY",
            Self::I444 => "I444",
            Self::Rgba => "RGBA",
            Self::Bgra => "BGRA",
            Self::Bgrx => "BGRx",
        }
    }

    /**
        Map a graph-side format name back to a host format.

        Returns `None` for names outside the supported set — callers must
        treat that as an explicit "unknown format", never pick a default.
    */
    pub fn from_graph_name(name: &str) -> Option<Self> {
        match name {
            "I420" => Some(Self::I420),
            "NV12" => Some(Self::Nv12),
            "YUY2" => Some(Self::Yuy2),
            "YVYU" => Some(Self::Yvyu),
            "UYVY" => Some(Self::Uyvy),
            "I444" => Some(Self::I444),
            "RGBA" | "RGBx" => Some(Self::Rgba),
            "BGRA" => Some(Self::Bgra),
            "BGRx" => Some(Self::Bgrx),
            _ => None,
        }
    }

    /**
        All supported formats, in the order they appear in capability
        constraints.
    */
    pub const ALL: [Self; 9] = [
        Self::I420,
        Self::Nv12,
        Self::Yuy2,
        Self::Yvyu,
        Self::Uyvy,
        Self::I444,
        Self::Rgba,
        Self::Bgra,
        Self::Bgrx,
    ];

    /**
        The total buffer size in bytes for a packed frame of the given
        dimensions.

        Must be recomputed whenever dimensions change; sizes are never valid
        across a format-affecting rebuild.
    */
    pub const fn buffer_size(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::I420 | Self::Nv12 => pixels * 3 / 2,
            Self::Yuy2 | Self::Yvyu | Self::Uyvy => pixels * 2,
            Self::I444 => pixels * 3,
            Self::Rgba | Self::Bgra | Self::Bgrx => pixels * 4,
        }
    }

    /**
        Per-plane offsets and strides for a packed frame of the given
        dimensions.
    */
    pub fn plane_layout(self, width: u32, height: u32) -> Vec<Plane> {
        let w = width as usize;
        let h = height as usize;
        match self {
            Self::I420 => vec![
                Plane { offset: 0, stride: w },
                Plane { offset: w * h, stride: w / 2 },
                Plane { offset: w * h + w * h / 4, stride: w / 2 },
            ],
            Self::Nv12 => vec![
                Plane { offset: 0, stride: w },
                Plane { offset: w * h, stride: w },
            ],
            Self::I444 => vec![
                Plane { offset: 0, stride: w },
                Plane { offset: w * h, stride: w },
                Plane { offset: 2 * w * h, stride: w },
            ],
            Self::Yuy2 | Self::Yvyu | Self::Uyvy => vec![Plane { offset: 0, stride: w * 2 }],
            Self::Rgba | Self::Bgra | Self::Bgrx => vec![Plane { offset: 0, stride: w * 4 }],
        }
    }

    /**
        Returns true if this is a planar (multi-plane) format.
    */
    pub const fn is_planar(self) -> bool {
        matches!(self, Self::I420 | Self::Nv12 | Self::I444)
    }
}

/**
    Host audio sample formats. All formats are interleaved.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer, little endian.
    S16,
    /// Signed 32-bit integer, little endian.
    S32,
    /// 32-bit floating point, little endian.
    F32,
}

impl SampleFormat {
    /**
        The graph-side name of this format.
    */
    pub const fn graph_name(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::S16 => "S16LE",
            Self::S32 => "S32LE",
            Self::F32 => "F32LE",
        }
    }

    /**
        Map a graph-side format name back to a host format.

        Returns `None` for names outside the supported set.
    */
    pub fn from_graph_name(name: &str) -> Option<Self> {
        match name {
            "U8" => Some(Self::U8),
            "S16LE" => Some(Self::S16),
            "S32LE" => Some(Self::S32),
            "F32LE" => Some(Self::F32),
            _ => None,
        }
    }

    /**
        All supported formats, in the order they appear in capability
        constraints.
    */
    pub const ALL: [Self; 4] = [Self::U8, Self::S16, Self::S32, Self::F32];

    /**
        Returns the number of bytes per sample.
    */
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
        }
    }
}

/**
    Audio speaker layout, keyed by channel count.

    The mapping from channel count to layout is total and injective over
    `{1, 2, 3, 4, 5, 6, 8}`; any other channel count has no layout and must
    be reported as unknown, never defaulted.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpeakerLayout {
    /// Single channel.
    Mono,
    /// Left and right.
    Stereo,
    /// Stereo plus low-frequency channel.
    TwoPointOne,
    /// Quadraphonic.
    FourPointZero,
    /// Quadraphonic plus low-frequency channel.
    FourPointOne,
    /// Surround 5.1.
    FivePointOne,
    /// Surround 7.1.
    SevenPointOne,
}

impl SpeakerLayout {
    /**
        Map a channel count to its speaker layout.

        Returns `None` for unmapped channel counts.
    */
    pub const fn from_channels(channels: u16) -> Option<Self> {
        match channels {
            1 => Some(Self::Mono),
            2 => Some(Self::Stereo),
            3 => Some(Self::TwoPointOne),
            4 => Some(Self::FourPointZero),
            5 => Some(Self::FourPointOne),
            6 => Some(Self::FivePointOne),
            8 => Some(Self::SevenPointOne),
            _ => None,
        }
    }

    /**
        Returns the number of channels in this layout.
    */
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::TwoPointOne => 3,
            Self::FourPointZero => 4,
            Self::FourPointOne => 5,
            Self::FivePointOne => 6,
            Self::SevenPointOne => 8,
        }
    }

    /// Channel counts that have a layout.
    pub const SUPPORTED_CHANNELS: [u16; 7] = [1, 2, 3, 4, 5, 6, 8];
}
