/*!
    Frame/sample marshaling between host structures and graph buffers.

    Inbound, host memory is copied plane-by-plane into the packed layout
    the graph expects, honoring host-side strides. Copying is the default;
    [`wrap_packed`] is the explicit zero-copy path for callers that can
    relinquish an already-packed buffer.

    Outbound, the graph buffer's declared capabilities are translated and
    the host structure is populated with plane offsets and strides computed
    from the packed layout. Unsupported shapes fail locally with an
    explicit error — callers log and substitute empty output; nothing is
    ever guessed.
*/

use mediagraph_types::{
    ContentDescriptor, Error, GraphBuffer, Pts, Result, SampleFormat, SpeakerLayout, VideoFormat,
};

use crate::host::{HostAudioFrame, HostVideoFrame, RawVideoFrame};

/// Rows in the given plane of a packed frame.
fn plane_rows(format: VideoFormat, plane: usize, height: u32) -> usize {
    match format {
        VideoFormat::I420 | VideoFormat::Nv12 if plane > 0 => height as usize / 2,
        _ => height as usize,
    }
}

/**
    Copy a host frame into the packed layout for `format`, honoring the
    host's per-plane strides.
*/
pub fn pack_video(frame: &RawVideoFrame<'_>, format: VideoFormat, width: u32, height: u32) -> Result<Vec<u8>> {
    let layout = format.plane_layout(width, height);
    if frame.planes.len() < layout.len() {
        return Err(Error::unsupported_format(format!(
            "{} planes supplied, {:?} needs {}",
            frame.planes.len(),
            format,
            layout.len(),
        )));
    }

    let mut packed = vec![0u8; format.buffer_size(width, height)];
    for (index, plane) in layout.iter().enumerate() {
        let source = &frame.planes[index];
        let rows = plane_rows(format, index, height);
        let row_bytes = plane.stride;
        if source.data.len() < rows.saturating_sub(1) * source.stride + row_bytes {
            return Err(Error::unsupported_format(format!(
                "plane {index} too short for {width}x{height} {format:?}"
            )));
        }
        for row in 0..rows {
            let src = &source.data[row * source.stride..row * source.stride + row_bytes];
            let dst_start = plane.offset + row * row_bytes;
            packed[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
    }
    Ok(packed)
}

/**
    Wrap an already-packed buffer without copying.

    The caller relinquishes the data; this is the documented zero-copy
    optimization for contracts where the memory would otherwise be copied
    straight back out.
*/
pub fn wrap_packed(data: Vec<u8>, pts: Option<Pts>, caps: ContentDescriptor) -> GraphBuffer {
    GraphBuffer::new(data, pts, caps)
}

/**
    Translate an extracted raw video buffer into a host frame.

    The timestamp is taken from the buffer; callers substituting
    synthesized timestamps overwrite it afterwards.
*/
pub fn unpack_video(buffer: GraphBuffer) -> Result<HostVideoFrame> {
    let Some(caps) = buffer.caps.as_video() else {
        return Err(Error::unsupported_format("buffer does not carry raw video"));
    };
    let Some(format) = VideoFormat::from_graph_name(&caps.format) else {
        return Err(Error::unsupported_format(format!("video format '{}'", caps.format)));
    };

    let expected = format.buffer_size(caps.width, caps.height);
    if buffer.data.len() < expected {
        return Err(Error::unsupported_format(format!(
            "video buffer holds {} bytes, {}x{} {format:?} needs {expected}",
            buffer.data.len(),
            caps.width,
            caps.height,
        )));
    }

    Ok(HostVideoFrame {
        width: caps.width,
        height: caps.height,
        format,
        planes: format.plane_layout(caps.width, caps.height),
        colorimetry: caps.colorimetry,
        timestamp: buffer.pts.unwrap_or(Pts(0)),
        time_base: buffer.time_base,
        data: buffer.data,
    })
}

/**
    Translate an extracted raw audio buffer into a host frame.

    The frame count is derived from the byte size and the bytes per sample
    frame. Unmapped formats or channel counts are explicit errors.
*/
pub fn unpack_audio(buffer: GraphBuffer) -> Result<HostAudioFrame> {
    let Some(caps) = buffer.caps.as_audio() else {
        return Err(Error::unsupported_format("buffer does not carry raw audio"));
    };
    let Some(format) = SampleFormat::from_graph_name(&caps.format) else {
        return Err(Error::unsupported_format(format!("audio format '{}'", caps.format)));
    };
    let Some(layout) = SpeakerLayout::from_channels(caps.channels) else {
        return Err(Error::unsupported_format(format!("channel count {}", caps.channels)));
    };

    let bytes_per_frame = format.bytes_per_sample() * caps.channels as usize;
    Ok(HostAudioFrame {
        frames: buffer.data.len() / bytes_per_frame,
        sample_rate: caps.rate,
        format,
        layout,
        timestamp: buffer.pts.unwrap_or(Pts(0)),
        time_base: buffer.time_base,
        data: buffer.data,
    })
}
