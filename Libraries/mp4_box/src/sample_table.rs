use crate::boxes::stbl::StblBox;

/// One sample of a track, resolved from the run-length tables of a `stbl`.
/// Times are in the media timescale of the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleInfo {
    pub offset: u64,             // Absolute file offset of the payload
    pub size: u32,
    pub decode_time: u64,
    pub composition_offset: i64, // Presentation time = decode_time + composition_offset
    pub duration: u32,
    pub is_sync: bool,
}

impl SampleInfo {
    pub fn presentation_time(&self) -> i64 {
        self.decode_time as i64 + self.composition_offset
    }
}

/// Every sample of a track in decode order.
#[derive(Clone, Debug, Default)]
pub struct SampleTable {
    pub samples: Vec<SampleInfo>,
}

// Upper bound for the initial allocation, the declared count comes from the file.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

impl SampleTable {
    pub fn from_stbl(stbl: &StblBox) -> Result<Self, String> {
        let sample_count = stbl.stsz.sample_count as usize;
        if stbl.stsz.sample_size == 0 && stbl.stsz.entry_sizes.len() != sample_count {
            return Err(format!(
                "STSZ declares {} samples but lists {} sizes",
                sample_count,
                stbl.stsz.entry_sizes.len()
            ));
        }

        let durations = expand_runs(stbl.stts.entries.iter().map(|e| (e.sample_count, e.sample_delta)), sample_count);
        if durations.len() != sample_count {
            return Err(format!("STTS covers only {} of {} samples", durations.len(), sample_count));
        }

        let composition_offsets = match &stbl.ctts {
            Some(ctts) => {
                let offsets = expand_runs(ctts.entries.iter().map(|e| (e.sample_count, e.sample_offset)), sample_count);
                if offsets.len() != sample_count {
                    return Err(format!("CTTS covers only {} of {} samples", offsets.len(), sample_count));
                }
                offsets
            }
            None => vec![0; sample_count],
        };

        let sync = match &stbl.stss {
            Some(stss) => {
                let mut flags = vec![false; sample_count];
                for &number in &stss.entries {
                    // Sample numbers are 1-based; out of range entries are ignored.
                    if number >= 1 && (number as usize) <= sample_count {
                        flags[number as usize - 1] = true;
                    }
                }
                flags
            }
            None => vec![true; sample_count],
        };

        let chunk_offsets: Vec<u64> = match (&stbl.co64, &stbl.stco) {
            (Some(co64), _) => co64.entries.clone(),
            (None, Some(stco)) => stco.entries.iter().map(|&o| o as u64).collect(),
            (None, None) => return Err("Missing STCO/CO64 box".into()),
        };

        let mut samples = Vec::with_capacity(sample_count.min(MAX_PREALLOCATED_SAMPLES));
        let mut decode_time = 0u64;
        let entries = &stbl.stsc.entries;

        for (i, entry) in entries.iter().enumerate() {
            if entry.first_chunk == 0 {
                return Err("STSC chunk numbers start at 1".into());
            }
            let last_chunk = match entries.get(i + 1) {
                Some(next) if next.first_chunk <= entry.first_chunk => {
                    return Err("STSC entries are not in increasing chunk order".into());
                }
                Some(next) => next.first_chunk - 1,
                None => chunk_offsets.len() as u32,
            };

            for chunk in entry.first_chunk..=last_chunk {
                let mut offset = *chunk_offsets
                    .get(chunk as usize - 1)
                    .ok_or_else(|| format!("STSC references chunk {} but only {} exist", chunk, chunk_offsets.len()))?;

                for _ in 0..entry.samples_per_chunk {
                    let index = samples.len();
                    if index >= sample_count {
                        return Err(format!("STSC maps more than the {} declared samples", sample_count));
                    }
                    let size = stbl
                        .stsz
                        .size_of(index)
                        .ok_or_else(|| format!("Missing size for sample {}", index))?;
                    samples.push(SampleInfo {
                        offset,
                        size,
                        decode_time,
                        composition_offset: composition_offsets[index] as i64,
                        duration: durations[index],
                        is_sync: sync[index],
                    });
                    offset = offset
                        .checked_add(size as u64)
                        .ok_or_else(|| format!("Offset of sample {} overflows", index + 1))?;
                    decode_time += durations[index] as u64;
                }
            }
        }

        if samples.len() != sample_count {
            return Err(format!("Chunks hold {} samples, expected {}", samples.len(), sample_count));
        }

        Ok(SampleTable { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Decode time at which the last sample ends.
    pub fn total_duration(&self) -> u64 {
        self.samples.last().map_or(0, |s| s.decode_time + s.duration as u64)
    }
}

// Expands (count, value) runs, stopping at `limit` values. Entries past the
// declared sample count are ignored.
fn expand_runs<T: Copy>(runs: impl Iterator<Item = (u32, T)>, limit: usize) -> Vec<T> {
    let mut values = Vec::with_capacity(limit.min(MAX_PREALLOCATED_SAMPLES));
    for (count, value) in runs {
        let take = (count as usize).min(limit - values.len());
        values.extend(std::iter::repeat(value).take(take));
        if values.len() == limit {
            break;
        }
    }
    values
}
