pub mod photo; // Photo ingestion: sniff, orient, downscale, re-encode
