//! Codec registry.

use rforge_models::VideoCodec;

/// How one codec's renditions are produced: the container extension, the
/// ffmpeg encoder to select, and the fixed quality flags appended to every
/// invocation.
#[derive(Debug, Clone)]
pub struct CodecDescriptor {
    pub codec: VideoCodec,
    /// Container extension without the dot (e.g. "webm").
    pub container: &'static str,
    /// Encoder passed to `-c:v`.
    pub encoder: String,
    /// Extra output arguments, already split into flag/value pairs.
    pub options: Vec<String>,
}

impl CodecDescriptor {
    fn defaults(codec: VideoCodec) -> Self {
        let (container, encoder, options): (&'static str, &str, &[&str]) = match codec {
            VideoCodec::Av1 => ("webm", "libsvtav1", &["-crf", "35", "-preset", "6"]),
            VideoCodec::H265 => ("mp4", "libx265", &["-crf", "35"]),
            VideoCodec::H264 => ("mp4", "libx264", &["-crf", "28"]),
        };
        Self {
            codec,
            container,
            encoder: encoder.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Defaults with the encoder overridable through the environment
    /// (`AV1_ENCODER`, `H265_ENCODER`, `H264_ENCODER`).
    fn from_env(codec: VideoCodec) -> Self {
        let mut descriptor = Self::defaults(codec);
        let key = format!("{}_ENCODER", codec.as_str().to_uppercase());
        if let Ok(encoder) = std::env::var(&key) {
            if !encoder.is_empty() {
                descriptor.encoder = encoder;
            }
        }
        descriptor
    }
}

/// Descriptor lookup for every supported codec. Built once at startup and
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    av1: CodecDescriptor,
    h265: CodecDescriptor,
    h264: CodecDescriptor,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self {
            av1: CodecDescriptor::defaults(VideoCodec::Av1),
            h265: CodecDescriptor::defaults(VideoCodec::H265),
            h264: CodecDescriptor::defaults(VideoCodec::H264),
        }
    }
}

impl CodecRegistry {
    /// Create the registry from environment variables.
    pub fn from_env() -> Self {
        Self {
            av1: CodecDescriptor::from_env(VideoCodec::Av1),
            h265: CodecDescriptor::from_env(VideoCodec::H265),
            h264: CodecDescriptor::from_env(VideoCodec::H264),
        }
    }

    pub fn descriptor(&self, codec: VideoCodec) -> &CodecDescriptor {
        match codec {
            VideoCodec::Av1 => &self.av1,
            VideoCodec::H265 => &self.h265,
            VideoCodec::H264 => &self.h264,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptors() {
        let registry = CodecRegistry::default();

        let av1 = registry.descriptor(VideoCodec::Av1);
        assert_eq!(av1.container, "webm");
        assert_eq!(av1.encoder, "libsvtav1");
        assert_eq!(av1.options, vec!["-crf", "35", "-preset", "6"]);

        let h265 = registry.descriptor(VideoCodec::H265);
        assert_eq!(h265.container, "mp4");
        assert_eq!(h265.encoder, "libx265");

        let h264 = registry.descriptor(VideoCodec::H264);
        assert_eq!(h264.container, "mp4");
        assert_eq!(h264.encoder, "libx264");
        assert_eq!(h264.options, vec!["-crf", "28"]);
    }

    #[test]
    fn test_descriptor_matches_codec() {
        let registry = CodecRegistry::default();
        for codec in VideoCodec::ALL {
            assert_eq!(registry.descriptor(codec).codec, codec);
        }
    }
}
