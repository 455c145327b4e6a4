// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use rtc_encoder::*;

struct PrintSink;

impl EncodedImageCallback for PrintSink {
    fn on_encoded_image(&mut self, image: &EncodedImage, _codec_specific: Option<&CodecSpecificInfo>, _fragmentation: Option<&FragmentationHeader>) -> CallbackResult {
        println!("encoded {:?} frame, {} bytes, qp {:?}, crc {:08x}",
            image.frame_type, image.payload.len(), image.qp, image.checksum);
        CallbackResult::delivered(image.rtp_timestamp)
    }

    fn on_dropped_frame(&mut self) {
        println!("encoder dropped a frame");
    }
}

fn main() {
    let _ = simple_log::new(simple_log::LogConfig::default());

    let mut encoder = Encoder::new(EncoderType::Vp8).unwrap();
    let settings = CodecSettings::with_defaults(VideoCodecType::Vp8, 640, 480);
    encoder.init_encode(&settings, 4, 1200).unwrap();
    encoder.register_callback(Box::new(PrintSink)).unwrap();

    let feedback = encoder.feedback_handle();

    for i in 0u32..60 {
        if i == 30 {
            // Simulate the congestion controller halving the target mid-stream.
            feedback.set_rates(150, 30);
            encoder.set_channel_parameters(30, 180).unwrap();
        }
        let frame = VideoFrame::filled(640, 480, PixelFormat::I420, (i * 4) as u8, i * 3000);
        let types = if i == 45 { Some([FrameType::Key]) } else { None };
        encoder.encode(&frame, None, types.as_ref().map(|t| t.as_slice())).unwrap();
    }

    println!("stats: {:?}", encoder.stats());
    encoder.release().unwrap();
}
