//! Concatenation of payloads.

use tessel_common::{Result, error::Error};

use crate::{
    element::ElementKind,
    payload::{Payload, PayloadView},
    segment::Segment,
    values::ValueBuffer,
    var_part::{self, VAR_OFFSET_SIZE},
};

impl Payload {
    /// Appends the cells of `other` after the cells of this payload.
    ///
    /// The segments of `other` are shifted by this payload's length and value count; its
    /// values are spliced after the values of this payload.
    pub fn append(&mut self, other: &PayloadView<'_>) -> Result<()> {
        if self.kind != other.kind() {
            return Err(Error::invalid_arg(
                "other",
                format!(
                    "cannot append {:?} values to a {:?} payload",
                    other.kind(),
                    self.kind
                ),
            ));
        }
        if other.is_empty() {
            return Ok(());
        }
        let head_len = self.len();
        let head_values = self.view().value_count();
        let tail_values = other.value_count();
        let head_slots = match self.kind {
            ElementKind::Variable => self.var_offset / VAR_OFFSET_SIZE,
            _ => head_values,
        };

        let shifted = other
            .segments()
            .iter()
            .map(|s| -> Result<Segment> {
                let mut s = *s;
                s.set_start_position(s.start_position() + head_len);
                if !s.is_null() {
                    s.set_data_index(shifted_index(s.data_index(), head_slots)?);
                }
                Ok(s)
            })
            .collect::<Result<Vec<_>>>()?;
        self.segments.pop();
        self.segments.extend(shifted);
        self.segments
            .push(Segment::terminal(head_len + other.len()));

        let src = other.value_slice();
        match self.kind {
            ElementKind::Fixed(size) => {
                let size = size as usize;
                self.data.truncate(head_values * size);
                self.data
                    .extend_from_slice(&src.data()[..tail_values * size]);
                self.var_offset = self.data.len();
            }
            ElementKind::Boolean => {
                let mut buffer = ValueBuffer::new(ElementKind::Boolean);
                let head = self.view().value_slice();
                buffer.extend_from_slice(&head, 0, head_values);
                buffer.extend_from_slice(&src, 0, tail_values);
                let (data, var_offset) = buffer.into_data();
                self.data = data;
                self.var_offset = var_offset;
            }
            ElementKind::Variable => {
                let head_var_len = self.data.len() - self.var_offset;
                let mut data = Vec::with_capacity(self.data.len() + src.data().len());
                data.extend_from_slice(&self.data[..self.var_offset]);
                for i in 0..src.var_offset() / VAR_OFFSET_SIZE {
                    let offset = var_part::read_offset(src.fixed_part(), i);
                    data.extend_from_slice(&((offset + head_var_len) as u32).to_le_bytes());
                }
                let var_offset = data.len();
                data.extend_from_slice(&self.data[self.var_offset..]);
                data.extend_from_slice(src.var_part());
                self.data = data;
                self.var_offset = var_offset;
            }
        }
        Ok(())
    }

    /// Concatenation of two payloads.
    pub fn concat(head: &PayloadView<'_>, tail: &PayloadView<'_>) -> Result<Payload> {
        let mut payload = head.to_payload();
        payload.append(tail)?;
        Ok(payload)
    }
}

fn shifted_index(index: u32, shift: usize) -> Result<u32> {
    let shifted = index as usize + shift;
    if shifted > crate::segment::MAX_DATA_INDEX as usize {
        return Err(Error::invalid_operation(
            "merged payload exceeds the data index range",
        ));
    }
    Ok(shifted as u32)
}
